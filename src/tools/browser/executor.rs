//! Browser executor - wraps agent-browser CLI
//!
//! Provides async interface to agent-browser commands. One executor is the
//! context of the web agent; every call runs in its named session.

use std::process::Stdio;
use tokio::process::Command;

use crate::core::config::BrowserConfig;
use crate::core::{ConductorError, Result};
use crate::tools::browser::snapshot::Snapshot;

/// Executor for browser automation via agent-browser CLI
#[derive(Debug, Clone)]
pub struct BrowserExecutor {
    /// Session name for isolation
    session_name: String,
    /// Whether to run in headed mode
    headed: bool,
    program: String,
}

impl BrowserExecutor {
    /// Create a new browser executor
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            headed: false,
            program: "agent-browser".to_string(),
        }
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        let mut executor = Self::new(config.session_name.clone());
        executor.set_headed(config.headed);
        executor
    }

    /// Set headed mode
    pub fn set_headed(&mut self, headed: bool) {
        self.headed = headed;
    }

    /// Use a different binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Check if agent-browser is installed
    pub async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run an agent-browser command
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--session", &self.session_name]);

        if self.headed {
            cmd.arg("--headed");
        }

        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        tracing::debug!(session = %self.session_name, ?args, "agent-browser");

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConductorError::AgentBrowserNotFound
            } else {
                ConductorError::browser(format!("Failed to run agent-browser: {}", e))
            }
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ConductorError::browser(format!(
                "agent-browser {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )))
        }
    }

    /// Interactive snapshot rendered for the model
    pub async fn snapshot(&self) -> Result<String> {
        let output = self.run_command(&["snapshot", "-i", "--json"]).await?;
        Ok(match Snapshot::parse(&output) {
            Some(snapshot) => snapshot.render(),
            None => output,
        })
    }

    /// Navigate to a URL and return the page snapshot
    pub async fn open(&self, url: &str) -> Result<String> {
        self.run_command(&["open", url]).await?;
        if let Err(e) = self.run_command(&["wait", "--load", "networkidle"]).await {
            tracing::debug!("wait for network idle failed: {}", e);
        }
        Ok(format!("Navigated to {}.\n{}", url, self.snapshot().await?))
    }

    /// Click an element by ref and return the updated snapshot
    pub async fn click(&self, ref_id: &str) -> Result<String> {
        self.run_command(&["click", ref_id]).await?;
        Ok(format!("Clicked {}.\n{}", ref_id, self.snapshot().await?))
    }

    /// Fill an input field
    pub async fn fill(&self, ref_id: &str, text: &str) -> Result<String> {
        self.run_command(&["fill", ref_id, text]).await?;
        Ok(format!("Filled {} with '{}'", ref_id, text))
    }

    /// Get text from an element
    pub async fn get_text(&self, ref_id: &str) -> Result<String> {
        let output = self.run_command(&["get", "text", ref_id]).await?;
        Ok(output.trim().to_string())
    }

    /// Press a key
    pub async fn press(&self, key: &str) -> Result<String> {
        self.run_command(&["press", key]).await?;
        Ok(format!("Pressed {}", key))
    }

    /// Scroll the page
    pub async fn scroll(&self, direction: &str, pixels: Option<u32>) -> Result<String> {
        let px_str = pixels.map(|px| px.to_string());
        let mut args = vec!["scroll", direction];
        if let Some(px) = &px_str {
            args.push(px);
        }

        self.run_command(&args).await?;
        Ok(format!("Scrolled {}", direction))
    }

    /// Close the browser
    pub async fn close(&self) -> Result<String> {
        self.run_command(&["close"]).await?;
        Ok("Browser closed".to_string())
    }
}

impl Default for BrowserExecutor {
    fn default() -> Self {
        Self::new("conductor")
    }
}
