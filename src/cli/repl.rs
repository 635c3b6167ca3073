//! Interactive REPL for Conductor
//!
//! Provides the main user interaction loop. Every task runs on its own tokio
//! task so Ctrl+C can abandon it without leaving the REPL.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::agent::Orchestrator;
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, Result};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    orchestrator: Arc<Orchestrator>,
}

impl Repl {
    /// Create a REPL with custom configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
        Ok(Self {
            config,
            orchestrator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        print!("Initializing...");
        io::stdout().flush()?;

        match self.orchestrator.initialize().await {
            Ok(()) => println!(" Ready!\n"),
            Err(e) => {
                println!("\n\nInitialization Error: {}\n", e);
                return Ok(());
            }
        }

        loop {
            print!("You: ");
            io::stdout().flush()?;

            let Some(input) = read_line().await? else {
                // EOF (Ctrl+D)
                println!("\nGoodbye!");
                break;
            };

            let previous = self.config.clone();
            match handle_command(&input, &mut self.config).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Handled(output)) => println!("{}\n", output),
                Ok(CommandResult::Reconfigured(output)) => match self.rebuild(previous) {
                    Ok(()) => println!("{}\n", output),
                    Err(e) => eprintln!("Settings unchanged, the agents could not be rebuilt: {}\n", e),
                },
                Ok(CommandResult::None) => continue,
                Ok(CommandResult::Continue(task)) => self.run_task(task).await,
                Err(e) => eprintln!("Command error: {}\n", e),
            }
        }

        Ok(())
    }

    /// Swap in an orchestrator for the current settings
    ///
    /// On failure the previous settings are restored so `status` keeps
    /// describing the orchestrator that is still running.
    fn rebuild(&mut self, previous: Config) -> Result<()> {
        match Orchestrator::from_config(&self.config) {
            Ok(orchestrator) => {
                self.orchestrator = Arc::new(orchestrator);
                Ok(())
            }
            Err(e) => {
                self.config = previous;
                Err(e)
            }
        }
    }

    /// Run one task on a separate tokio task
    async fn run_task(&self, task: String) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let handle = tokio::spawn(async move { orchestrator.invoke(&task).await });
        let abort = handle.abort_handle();

        tokio::select! {
            joined = handle => match joined {
                Ok(Ok(answer)) => println!("\nConductor:\n{}\n", answer),
                Ok(Err(e)) => eprintln!("\nError: {}\n", e),
                Err(e) => eprintln!("\nTask failed: {}\n", e),
            },
            _ = tokio::signal::ctrl_c() => {
                abort.abort();
                println!("\nTask cancelled.\n");
            }
        }
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!(
            r#"
  ____                _            _
 / ___|___  _ __   __| |_   _  ___| |_ ___  _ __
| |   / _ \| '_ \ / _` | | | |/ __| __/ _ \| '__|
| |__| (_) | | | | (_| | |_| | (__| || (_) | |
 \____\___/|_| |_|\__,_|\__,_|\___|\__\___/|_|

  Multi-agent task orchestrator
"#
        );
        println!("Provider: {:?}", self.config.provider);
        println!("Model:    {}", self.config.model);
        println!();
        println!("Commands: help, status, set, exit");
        println!("─────────────────────────────────────────────────");
    }
}

/// Read one trimmed line from stdin without blocking the runtime
async fn read_line() -> Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut input = String::new();
        io::stdin().lock().read_line(&mut input).map(|n| (n, input))
    })
    .await
    .map_err(|e| crate::core::ConductorError::Other(format!("stdin reader failed: {}", e)))??;

    match line {
        (0, _) => Ok(None),
        (_, input) => Ok(Some(input.trim().to_string())),
    }
}
