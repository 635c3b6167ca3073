//! Terminal tools
//!
//! The terminal agent's context is a [`TerminalSession`]: which shell to run,
//! where, and for how long.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use crate::core::config::TerminalConfig;
use crate::core::{ConductorError, Result};
use crate::tools::registry::{required_str, Action, ActionInput, Executable};

/// Output beyond this many characters is cut
const MAX_OUTPUT_CHARS: usize = 8000;

/// Shell settings shared by every command of one terminal agent
#[derive(Debug, Clone)]
pub struct TerminalSession {
    pub shell: String,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl TerminalSession {
    pub fn from_config(config: &TerminalConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            working_dir: config
                .working_dir
                .clone()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Run `command` through `shell -c` and describe the outcome
    pub async fn run(&self, command: &str) -> Result<String> {
        tracing::debug!(shell = %self.shell, %command, "running shell command");

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                ConductorError::tool(format!(
                    "command timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ConductorError::with_context(format!("failed to start {}", self.shell), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut text = String::new();
        if !stdout.trim().is_empty() {
            text.push_str(stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str("stderr: ");
            text.push_str(stderr.trim_end());
        }

        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        if text.is_empty() {
            text = "(no output)".to_string();
        }

        Ok(format!("Exit code: {}\n{}", code, truncate(&text, MAX_OUTPUT_CHARS)))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n... (output truncated)", &text[..cut]),
        None => text.to_string(),
    }
}

struct Shell;

#[async_trait]
impl Executable<TerminalSession> for Shell {
    async fn call(&self, input: ActionInput, session: &TerminalSession) -> Result<String> {
        session.run(required_str(&input, "command")?).await
    }
}

/// Actions available to the terminal agent
pub fn terminal_actions() -> Vec<Action<TerminalSession>> {
    vec![Action::new(
        "shell",
        "Run a non-interactive shell command and return its exit code and output",
        json!({
            "type": "object",
            "properties": {"command": {"type": "string", "description": "Command line to run"}},
            "required": ["command"]
        }),
        Shell,
    )]
}
