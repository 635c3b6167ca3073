//! Custom error types for Conductor
//!
//! Provides a unified error handling system across all modules.
//!
//! Most failures inside the reasoning loops are turned into observation text
//! and never surface here. What does surface is misconfiguration caught at
//! construction time and failures of the model backend itself.

use thiserror::Error;

/// Main error type for Conductor operations
#[derive(Error, Debug)]
pub enum ConductorError {
    /// Model provider connection or API errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt template errors (unknown or malformed placeholders)
    #[error("Template error: {0}")]
    Template(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Browser automation errors
    #[error("Browser error: {0}")]
    Browser(String),

    /// Desktop automation errors
    #[error("Desktop error: {0}")]
    Desktop(String),

    /// Speech synthesis or playback errors
    #[error("Speech error: {0}")]
    Speech(String),

    /// Episodic memory errors
    #[error("Memory error: {0}")]
    Memory(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// agent-browser not installed
    #[error("agent-browser not found. Install with: npm install -g agent-browser && agent-browser install")]
    AgentBrowserNotFound,

    /// Model not available
    #[error("Model '{0}' not available. Run: ollama pull {0}")]
    ModelNotFound(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Conductor operations
pub type Result<T> = std::result::Result<T, ConductorError>;

impl ConductorError {
    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a template error
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create a desktop error
    pub fn desktop(msg: impl Into<String>) -> Self {
        Self::Desktop(msg.into())
    }

    /// Create a speech error
    pub fn speech(msg: impl Into<String>) -> Self {
        Self::Speech(msg.into())
    }

    /// Create a memory error
    pub fn memory(msg: impl Into<String>) -> Self {
        Self::Memory(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Whether this error is a construction-time misconfiguration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Template(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ConductorError::tool("boom").to_string(),
            "Tool execution error: boom"
        );
        assert_eq!(
            ConductorError::ModelNotFound("llama3".into()).to_string(),
            "Model 'llama3' not available. Run: ollama pull llama3"
        );
    }

    #[test]
    fn test_configuration_class() {
        assert!(ConductorError::template("missing {user}").is_configuration());
        assert!(ConductorError::config("no key").is_configuration());
        assert!(!ConductorError::llm("timeout").is_configuration());
    }

    #[test]
    fn test_with_context_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ConductorError::with_context("reading prompt", io);
        assert_eq!(err.to_string(), "reading prompt: gone");
        assert!(std::error::Error::source(&err).is_some());
    }
}
