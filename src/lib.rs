//! Conductor - multi-agent task orchestrator
//!
//! Routes natural-language tasks to specialised sub-agents (web, terminal,
//! desktop) through a model-driven reason/act loop, optionally narrating
//! progress through speech.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Model provider abstraction with Ollama and Gemini backends
//! - **Tools**: Action registry plus terminal, browser and desktop actions
//! - **Agent**: Directive parser, sub-agent loop and the orchestrator
//! - **Speech**: Progress narration
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use conductor::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> conductor::Result<()> {
//!     let orchestrator = Orchestrator::from_config(&Config::load())?;
//!     orchestrator.initialize().await?;
//!
//!     let answer = orchestrator.invoke("How much disk space is free?").await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod speech;
pub mod tools;

// Re-export commonly used items
pub use agent::{Orchestrator, SubAgent};
pub use cli::Repl;
pub use core::{Config, ConductorError, ProviderType, Result};
