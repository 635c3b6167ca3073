//! Configuration management for Conductor
//!
//! Supports environment variables, config files, and runtime overrides.
//! Credentials are read from the environment (or a `.env` file) and are never
//! written back to disk.
//!
//! Config file location: ~/.config/conductor/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{ConductorError, Result};

/// Main configuration for Conductor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which model backend to use
    #[serde(default)]
    pub provider: ProviderType,
    /// Model name passed to the provider
    pub model: String,
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Terminal sub-agent configuration
    #[serde(default)]
    pub terminal: TerminalConfig,
    /// Web sub-agent configuration
    #[serde(default)]
    pub browser: BrowserConfig,
    /// System sub-agent configuration
    #[serde(default)]
    pub desktop: DesktopConfig,
    /// Narration configuration
    #[serde(default)]
    pub speech: SpeechConfig,
    /// Episodic memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Prompt template overrides
    #[serde(default)]
    pub prompts: PromptConfig,
}

/// Supported model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Google Gemini API
    Gemini,
}

impl std::str::FromStr for ProviderType {
    type Err = ConductorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderType::Ollama),
            "gemini" => Ok(ProviderType::Gemini),
            other => Err(ConductorError::config(format!(
                "Unknown provider '{}'. Expected 'ollama' or 'gemini'",
                other
            ))),
        }
    }
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API base URL
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Iteration budget for every reasoning loop
    /// Default: 10
    pub max_iteration: usize,
    /// How many times to re-ask the model when a reply carries no directive
    /// Default: 0
    #[serde(default)]
    pub parse_retries: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Log every step at debug level
    pub verbose: bool,
    /// Log token usage after each model call
    #[serde(default)]
    pub token_usage: bool,
    /// Tell the system and web agents that screenshots may be described
    #[serde(default)]
    pub use_vision: bool,
    /// Extra numbered instructions for the sub-agents
    #[serde(default)]
    pub instructions: Vec<String>,
}

/// Terminal sub-agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Shell used to run commands
    pub shell: String,
    /// Per-command timeout in seconds
    pub timeout_secs: u64,
    /// Working directory (default: home directory)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Session name for agent-browser
    pub session_name: String,
    /// Whether to run in headed mode (visible browser)
    pub headed: bool,
}

/// Desktop automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopConfig {
    /// Binary used to drive the desktop
    pub xdotool: String,
    /// Binary used to launch applications and open files
    pub opener: String,
}

/// Narration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Whether progress is spoken
    pub enabled: bool,
    /// Text-to-speech command; the text is written to its stdin
    pub command: String,
    /// Extra arguments for the command
    #[serde(default)]
    pub args: Vec<String>,
}

/// Episodic memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Whether sub-agents consult and record past runs
    pub enabled: bool,
    /// Store file (default: data dir/conductor/memory.json)
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Minimum keyword overlap for a past run to count as relevant
    pub min_relevance: f32,
}

/// Prompt template overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Directory containing `<agent>/<template>.md` overrides
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        let provider = env::var("CONDUCTOR_PROVIDER")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default();

        let model = env::var("CONDUCTOR_MODEL").unwrap_or_else(|_| match provider {
            ProviderType::Ollama => "qwen3:8b".to_string(),
            ProviderType::Gemini => "gemini-2.0-flash".to_string(),
        });

        Self {
            provider,
            model,
            ollama: OllamaConfig::default(),
            gemini: GeminiConfig::default(),
            agent: AgentConfig::default(),
            terminal: TerminalConfig::default(),
            browser: BrowserConfig::default(),
            desktop: DesktopConfig::default(),
            speech: SpeechConfig::default(),
            memory: MemoryConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 120,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iteration: env::var("CONDUCTOR_MAX_ITERATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            parse_retries: 0,
            temperature: 0.0,
            verbose: env_flag("CONDUCTOR_VERBOSE", false),
            token_usage: env_flag("CONDUCTOR_TOKEN_USAGE", false),
            use_vision: false,
            instructions: Vec::new(),
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string()),
            timeout_secs: 60,
            working_dir: None,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            session_name: env::var("CONDUCTOR_BROWSER_SESSION")
                .unwrap_or_else(|_| "conductor".to_string()),
            headed: env_flag("CONDUCTOR_BROWSER_HEADED", true),
        }
    }
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            xdotool: "xdotool".to_string(),
            opener: "xdg-open".to_string(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: env_flag("CONDUCTOR_TTS", false),
            command: "espeak".to_string(),
            args: vec!["-s".to_string(), "175".to_string()],
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: env_flag("CONDUCTOR_MEMORY", false),
            path: None,
            min_relevance: 0.5,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("conductor")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(ConductorError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ConductorError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ConductorError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).map_err(|e| {
                ConductorError::config(format!("Failed to create config dir: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConductorError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| ConductorError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Resolve the Gemini API key from the environment
    pub fn gemini_api_key(&self) -> Result<String> {
        env::var(&self.gemini.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConductorError::config(format!(
                    "{} is not set; export it or add it to .env",
                    self.gemini.api_key_env
                ))
            })
    }

    /// Resolve the episodic memory store path
    pub fn memory_path(&self) -> PathBuf {
        self.memory.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("conductor")
                .join("memory.json")
        })
    }

    /// Check invariants that must hold before any agent is built
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iteration == 0 {
            return Err(ConductorError::config("agent.max_iteration must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(ConductorError::config("model must not be empty"));
        }
        if self.speech.enabled && self.speech.command.trim().is_empty() {
            return Err(ConductorError::config(
                "speech.command must be set when speech is enabled",
            ));
        }
        for (name, endpoint) in [
            ("ollama", self.ollama_url()),
            ("gemini.base_url", self.gemini.base_url.clone()),
        ] {
            url::Url::parse(&endpoint).map_err(|e| {
                ConductorError::config(format!("{} endpoint '{}' is invalid: {}", name, endpoint, e))
            })?;
        }
        if !(0.0..=1.0).contains(&self.memory.min_relevance) {
            return Err(ConductorError::config(
                "memory.min_relevance must be between 0 and 1",
            ));
        }
        Ok(())
    }

    /// Apply a `key value` override, as used by the REPL `set` command
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parse_bool = |v: &str| match v {
            "on" | "true" | "1" | "yes" => Ok(true),
            "off" | "false" | "0" | "no" => Ok(false),
            _ => Err(ConductorError::config(format!("Expected on/off, got '{}'", v))),
        };

        match key {
            "model" => self.model = value.to_string(),
            "provider" => self.provider = value.parse()?,
            "max_iteration" => {
                self.agent.max_iteration = value
                    .parse()
                    .map_err(|_| ConductorError::config("max_iteration must be a number"))?
            }
            "verbose" => {
                return Err(ConductorError::config(
                    "verbose is fixed at startup; use --verbose or CONDUCTOR_VERBOSE",
                ))
            }
            "tts" | "speech" => self.speech.enabled = parse_bool(value)?,
            "memory" => self.memory.enabled = parse_bool(value)?,
            "vision" => self.agent.use_vision = parse_bool(value)?,
            "headed" => self.browser.headed = parse_bool(value)?,
            other => return Err(ConductorError::config(format!("Unknown setting '{}'", other))),
        }

        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ollama.timeout_secs, 120);
        assert_eq!(config.gemini.api_key_env, "GEMINI_API_KEY");
        assert!(config.agent.max_iteration >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("max_iteration"));
        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.agent.max_iteration, config.agent.max_iteration);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let config = Config::from_toml(
            r#"
provider = "gemini"
model = "gemini-2.0-flash"

[agent]
max_iteration = 4
temperature = 0.2
verbose = true
"#,
        )
        .unwrap();
        assert_eq!(config.provider, ProviderType::Gemini);
        assert_eq!(config.agent.max_iteration, 4);
        assert_eq!(config.agent.parse_retries, 0);
        assert_eq!(config.desktop.xdotool, "xdotool");
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let mut config = Config::default();
        config.agent.max_iteration = 0;
        assert!(matches!(config.validate(), Err(ConductorError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = Config::default();
        config.gemini.base_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gemini.base_url"));
    }

    #[test]
    fn test_set_overrides() {
        let mut config = Config::default();
        config.set("max_iteration", "3").unwrap();
        config.set("tts", "off").unwrap();
        assert_eq!(config.agent.max_iteration, 3);
        assert!(!config.speech.enabled);
        assert!(config.set("max_iteration", "lots").is_err());
        assert!(config.set("colour", "blue").is_err());
        assert!(config.set("verbose", "on").unwrap_err().is_configuration());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Gemini".parse::<ProviderType>().unwrap(), ProviderType::Gemini);
        assert!("openai".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("conductor"));
    }
}
