//! Conductor - multi-agent task orchestrator
//!
//! Main entry point for the CLI application.

use clap::Parser;
use conductor::{Config, Orchestrator, ProviderType, Repl};
use tracing_subscriber::EnvFilter;

/// Conductor - routes tasks to web, terminal and desktop agents
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model backend (ollama or gemini)
    #[arg(long)]
    provider: Option<ProviderType>,

    /// Model name
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Iteration budget for every agent loop
    #[arg(long)]
    max_iteration: Option<usize>,

    /// Log every step
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Speak progress through the configured TTS command
    #[arg(long)]
    tts: bool,

    /// Consult and record episodic memory
    #[arg(long)]
    memory: bool,

    /// Run in headed browser mode (visible window)
    #[arg(long)]
    headed: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "conductor=debug" } else { "conductor=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(max) = args.max_iteration {
        config.agent.max_iteration = max;
    }
    if args.verbose {
        config.agent.verbose = true;
    }
    if args.tts {
        config.speech.enabled = true;
    }
    if args.memory {
        config.memory.enabled = true;
    }
    if args.headed {
        config.browser.headed = true;
    }

    init_tracing(config.agent.verbose);
    config.validate()?;

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let orchestrator = Orchestrator::from_config(&config)?;
        orchestrator.initialize().await?;

        let answer = orchestrator.invoke(&prompt).await?;
        println!("{}", answer);
        return Ok(());
    }

    // Interactive REPL mode
    let mut repl = Repl::with_config(config)?;
    repl.run().await?;

    Ok(())
}
