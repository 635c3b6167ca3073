//! The three sub-agents and the factory that builds them
//!
//! Each kind pairs a tool set with its execution context: a terminal session,
//! a browser session or a desktop handle.

use std::fmt;
use std::sync::Arc;

use crate::agent::memory::{EpisodicMemory, FileMemory};
use crate::agent::sub_agent::{AgentPrompts, ReactAgent, SubAgent};
use crate::agent::templates;
use crate::core::{Config, Result};
use crate::llm::LLMProvider;
use crate::tools::browser::{web_actions, BrowserExecutor};
use crate::tools::desktop::{desktop_actions, DesktopHandle, XdotoolDesktop};
use crate::tools::registry::Registry;
use crate::tools::terminal::{terminal_actions, TerminalSession};

/// Sub-agents the orchestrator can delegate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Web,
    Terminal,
    System,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Web, AgentKind::Terminal, AgentKind::System];

    /// Resolve a name such as `web`, `Web Agent` or `terminal_agent`
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name
            .trim()
            .trim_matches('*')
            .to_lowercase()
            .replace(['-', '_'], " ");
        let normalized = normalized.trim();
        let base = normalized
            .strip_suffix("agent")
            .map(str::trim_end)
            .unwrap_or(normalized);

        match base {
            "web" | "browser" => Some(AgentKind::Web),
            "terminal" | "shell" => Some(AgentKind::Terminal),
            "system" | "desktop" | "computer" => Some(AgentKind::System),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Web => "Web Agent",
            AgentKind::Terminal => "Terminal Agent",
            AgentKind::System => "System Agent",
        }
    }

    /// Directory name used for prompt overrides
    pub fn slug(&self) -> &'static str {
        match self {
            AgentKind::Web => "web",
            AgentKind::Terminal => "terminal",
            AgentKind::System => "system",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::Web => "Browses the web to find information and complete tasks in a browser.",
            AgentKind::Terminal => "Runs shell commands, scripts and file operations.",
            AgentKind::System => "Launches and controls desktop applications with mouse and keyboard.",
        }
    }

    fn role(&self) -> &'static str {
        match self {
            AgentKind::Web => templates::WEB_SYSTEM,
            AgentKind::Terminal => templates::TERMINAL_SYSTEM,
            AgentKind::System => templates::SYSTEM_SYSTEM,
        }
    }

    /// Load and validate this kind's prompt templates
    pub fn prompts(&self, config: &Config) -> Result<AgentPrompts> {
        AgentPrompts::load(config.prompts.dir.as_deref(), self.slug(), self.role())
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Builds a fresh sub-agent for every delegation
pub trait SubAgentFactory: Send + Sync {
    fn build(&self, kind: AgentKind) -> Result<Box<dyn SubAgent>>;
}

/// Factory for the built-in terminal, web and system agents
pub struct DefaultSubAgentFactory {
    config: Config,
    llm: Arc<dyn LLMProvider>,
    desktop: DesktopHandle,
    memory: Option<Arc<dyn EpisodicMemory>>,
}

impl DefaultSubAgentFactory {
    /// Create the factory, validating every kind's templates up front
    pub fn new(config: Config, llm: Arc<dyn LLMProvider>) -> Result<Self> {
        let desktop: DesktopHandle = Arc::new(XdotoolDesktop::from_config(&config.desktop));
        Self::with_desktop(config, llm, desktop)
    }

    /// Create the factory with a custom desktop backend
    pub fn with_desktop(
        config: Config,
        llm: Arc<dyn LLMProvider>,
        desktop: DesktopHandle,
    ) -> Result<Self> {
        for kind in AgentKind::ALL {
            kind.prompts(&config)?;
        }

        let memory = config.memory.enabled.then(|| {
            Arc::new(FileMemory::new(config.memory_path(), config.memory.min_relevance))
                as Arc<dyn EpisodicMemory>
        });

        Ok(Self {
            config,
            llm,
            desktop,
            memory,
        })
    }

    fn agent<C: Send + Sync + 'static>(
        &self,
        kind: AgentKind,
        registry: Registry<C>,
        context: C,
    ) -> Result<Box<dyn SubAgent>> {
        let agent = ReactAgent::builder(kind.display_name())
            .description(kind.description())
            .llm(Arc::clone(&self.llm))
            .config(&self.config)
            .registry(registry)
            .context(context)
            .prompts(kind.prompts(&self.config)?)
            .memory(self.memory.clone())
            .build()?;
        Ok(Box::new(agent))
    }
}

impl SubAgentFactory for DefaultSubAgentFactory {
    fn build(&self, kind: AgentKind) -> Result<Box<dyn SubAgent>> {
        match kind {
            AgentKind::Terminal => self.agent(
                kind,
                Registry::new(terminal_actions()),
                TerminalSession::from_config(&self.config.terminal),
            ),
            AgentKind::Web => self.agent(
                kind,
                Registry::new(web_actions()),
                BrowserExecutor::from_config(&self.config.browser),
            ),
            AgentKind::System => self.agent(
                kind,
                Registry::new(desktop_actions()),
                Arc::clone(&self.desktop),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Message;
    use crate::llm::{GenerateOptions, LLMResponse};
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl LLMProvider for Silent {
        async fn invoke(
            &self,
            _messages: &[Message],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            Ok(LLMResponse::text("Route: Final\nFinal Answer: nothing to do", "silent"))
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    #[test]
    fn test_from_name_variants() {
        assert_eq!(AgentKind::from_name("web"), Some(AgentKind::Web));
        assert_eq!(AgentKind::from_name("Web Agent"), Some(AgentKind::Web));
        assert_eq!(AgentKind::from_name("**Terminal Agent**"), Some(AgentKind::Terminal));
        assert_eq!(AgentKind::from_name("terminal_agent"), Some(AgentKind::Terminal));
        assert_eq!(AgentKind::from_name("SYSTEM"), Some(AgentKind::System));
        assert_eq!(AgentKind::from_name("systemagent"), Some(AgentKind::System));
        assert_eq!(AgentKind::from_name("agent"), None);
        assert_eq!(AgentKind::from_name("final"), None);
        assert_eq!(AgentKind::from_name(""), None);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in AgentKind::ALL {
            assert_eq!(AgentKind::from_name(kind.display_name()), Some(kind));
            assert_eq!(AgentKind::from_name(kind.slug()), Some(kind));
        }
    }

    #[tokio::test]
    async fn test_factory_builds_every_kind() {
        let factory = DefaultSubAgentFactory::new(Config::default(), Arc::new(Silent)).unwrap();
        for kind in AgentKind::ALL {
            let agent = factory.build(kind).unwrap();
            assert_eq!(agent.name(), kind.display_name());
            assert_eq!(agent.invoke("anything").await.unwrap(), "nothing to do");
        }
    }

    #[test]
    fn test_factory_rejects_bad_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("web")).unwrap();
        std::fs::write(dir.path().join("web").join("answer.md"), "{unknown}").unwrap();

        let mut config = Config::default();
        config.prompts.dir = Some(dir.path().to_path_buf());
        let err = DefaultSubAgentFactory::new(config, Arc::new(Silent)).err().unwrap();
        assert!(err.is_configuration());
    }
}
