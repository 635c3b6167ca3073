//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::core::{Config, ProviderType, Result};
use crate::llm::OllamaClient;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Not a command; run it as a task
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// A setting changed; the orchestrator must be rebuilt
    Reconfigured(String),
    /// Exit the REPL
    Exit,
    /// No output needed
    None,
}

/// Parse and handle special commands
pub async fn handle_command(input: &str, config: &mut Config) -> Result<CommandResult> {
    let input = input.trim();
    let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
    let cmd = cmd.to_lowercase();
    let args = args.trim();

    match cmd.as_str() {
        "" => Ok(CommandResult::None),

        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "status" => Ok(CommandResult::Handled(status_text(config))),

        "set" => handle_set_command(args, config),

        "save" => {
            let path = config.save()?;
            Ok(CommandResult::Handled(format!("Configuration saved to {}", path.display())))
        }

        "models" => {
            if config.provider != ProviderType::Ollama {
                return Ok(CommandResult::Handled(format!(
                    "Model listing is only available for Ollama (current provider: {:?})",
                    config.provider
                )));
            }
            let models = OllamaClient::from_config(config)?.list_models().await?;
            Ok(CommandResult::Handled(format!(
                "Available models:\n{}\n\nCurrent: {}",
                models
                    .iter()
                    .map(|m| format!("  - {}", m))
                    .collect::<Vec<_>>()
                    .join("\n"),
                config.model
            )))
        }

        _ => {
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// Handle 'set' subcommands
fn handle_set_command(args: &str, config: &mut Config) -> Result<CommandResult> {
    let (key, value) = args.split_once(' ').unwrap_or((args, ""));
    let key = key.to_lowercase();
    let value = value.trim();

    if key.is_empty() || value.is_empty() {
        return Ok(CommandResult::Handled(
            "Usage: set <key> <value>\n\
             Keys: model, provider, max_iteration, tts, memory, vision, headed\n\
             Examples:\n\
               set model qwen3:8b\n\
               set max_iteration 5\n\
               set tts on"
                .to_string(),
        ));
    }

    let mut updated = config.clone();
    match updated.set(&key, value) {
        Ok(()) => {
            *config = updated;
            Ok(CommandResult::Reconfigured(format!("{} set to {}", key, value)))
        }
        Err(e) => Ok(CommandResult::Handled(e.to_string())),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn status_text(config: &Config) -> String {
    format!(
        "Conductor Status:\n\
         ─────────────────────────────\n\
         Provider:      {:?}\n\
         Model:         {}\n\
         Max iteration: {}\n\
         Verbose:       {} (fixed at startup)\n\
         Speech:        {}\n\
         Memory:        {}\n\
         Vision:        {}\n\
         Browser:       session '{}'{}",
        config.provider,
        config.model,
        config.agent.max_iteration,
        on_off(config.agent.verbose),
        on_off(config.speech.enabled),
        on_off(config.memory.enabled),
        on_off(config.agent.use_vision),
        config.browser.session_name,
        if config.browser.headed { ", headed" } else { "" },
    )
}

/// Generate help text
fn help_text() -> String {
    r#"Conductor Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit Conductor
  status           Show current configuration
  models           List available Ollama models
  save             Write the configuration file

  set model <name>           Switch model
  set provider <name>        ollama or gemini
  set max_iteration <n>      Iteration budget per agent
  set tts <on|off>           Speak progress
  set memory <on|off>        Use episodic memory
  set vision <on|off>        Tell agents screenshots may be attached
  set headed <on|off>        Show the browser window

Anything else is run as a task. The orchestrator routes it
to the Web, Terminal or System agent as needed.

Keyboard Shortcuts:
  Ctrl+C           Cancel the running task
  Ctrl+D           Exit Conductor
─────────────────────────────────────────────"#
        .to_string()
}
