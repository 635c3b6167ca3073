//! Agent orchestrator
//!
//! Top-level agent that routes a task to the web, terminal and system
//! sub-agents. Same reason/controller loop as a sub-agent, except that each
//! "action" is a whole sub-agent invocation whose answer comes back as one
//! observation message.

use std::sync::Arc;

use crate::agent::directive::Directive;
use crate::agent::kinds::{AgentKind, DefaultSubAgentFactory, SubAgentFactory};
use crate::agent::prompt::{load_template, PromptTemplate, RuntimeContext};
use crate::agent::state::{AgentState, Budget, MAX_ITERATION_ANSWER};
use crate::agent::templates;
use crate::core::{Config, ConductorError, Result};
use crate::llm::{create_provider, GenerateOptions, LLMProvider};
use crate::speech::{narrator_from_config, summarize_response, Narrator};

/// Prompt override directory name of the orchestrator
const ORCHESTRATOR_SLUG: &str = "orchestrator";

/// Where the orchestrator goes after a Reason step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Delegate(AgentKind),
    Final,
}

impl Route {
    /// Resolve a directive's route
    ///
    /// `Route: Agent` takes the kind from `Agent Name`; `Route: <kind>` names
    /// it directly. Everything else, including an unknown agent, is Final.
    pub fn resolve(directive: &Directive) -> Self {
        let Some(route) = directive.route() else {
            return Route::Final;
        };

        let kind = if route.trim().eq_ignore_ascii_case("agent") {
            directive.agent_name().and_then(AgentKind::from_name)
        } else {
            AgentKind::from_name(route)
        };

        kind.map(Route::Delegate).unwrap_or(Route::Final)
    }
}

/// The top-level agent
pub struct Orchestrator {
    model: String,
    llm: Arc<dyn LLMProvider>,
    factory: Arc<dyn SubAgentFactory>,
    narrator: Option<Arc<dyn Narrator>>,
    system: PromptTemplate,
    human: PromptTemplate,
    max_iteration: usize,
    parse_retries: usize,
    temperature: f32,
}

impl Orchestrator {
    /// Create an orchestrator from its collaborators
    pub fn new(
        config: &Config,
        llm: Arc<dyn LLMProvider>,
        factory: Arc<dyn SubAgentFactory>,
        narrator: Option<Arc<dyn Narrator>>,
    ) -> Result<Self> {
        config.validate()?;
        let dir = config.prompts.dir.as_deref();

        Ok(Self {
            model: config.model.clone(),
            llm,
            factory,
            narrator,
            system: load_template(
                dir,
                ORCHESTRATOR_SLUG,
                "system",
                templates::ORCHESTRATOR_SYSTEM,
                templates::ORCHESTRATOR_SYSTEM_PARAMS,
            )?,
            human: load_template(
                dir,
                ORCHESTRATOR_SLUG,
                "human",
                templates::ORCHESTRATOR_HUMAN,
                templates::ORCHESTRATOR_HUMAN_PARAMS,
            )?,
            max_iteration: config.agent.max_iteration,
            parse_retries: config.agent.parse_retries,
            temperature: config.agent.temperature,
        })
    }

    /// Wire up the configured provider, the built-in sub-agents and narration
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = create_provider(config)?;
        let factory = DefaultSubAgentFactory::new(config.clone(), Arc::clone(&llm))?;
        let narrator = narrator_from_config(&config.speech);
        Self::new(config, llm, Arc::new(factory), narrator)
    }

    /// Check that the model backend answers
    pub async fn initialize(&self) -> Result<()> {
        if self.llm.is_available().await? {
            Ok(())
        } else {
            Err(ConductorError::ModelNotFound(self.model.clone()))
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a task and return the final answer
    pub async fn invoke(&self, input: &str) -> Result<String> {
        Ok(self.run(input).await?.into_output())
    }

    /// Run a task and return the final state
    pub async fn run(&self, input: &str) -> Result<AgentState> {
        self.narrate(&format!("Starting new task: {}", input)).await;

        let mut state = AgentState::new(input, self.system_prompt(), format!("Task: {}", input));

        loop {
            state = self.reason(state).await?;

            let (next, budget) = state.controller(self.max_iteration);
            state = next;
            let route = match budget {
                Budget::Within => Route::resolve(state.directive()),
                Budget::Exhausted => {
                    self.narrate("Maximum iterations reached. Preparing final answer.")
                        .await;
                    Route::Final
                }
            };

            match route {
                Route::Delegate(kind) => {
                    self.narrate(&format!("Routing to {}", kind)).await;
                    state = self.delegate(state, kind).await;
                }
                Route::Final => {
                    if !state.exhausted() {
                        self.narrate("Preparing final answer").await;
                    }
                    state = self.finish(state);
                    let answer = state.output().unwrap_or_default().to_string();
                    self.narrate(&format!("Final answer: {}", answer)).await;
                    return Ok(state);
                }
            }
        }
    }

    fn system_prompt(&self) -> String {
        let runtime = RuntimeContext::detect();
        self.system.render(&[
            ("user", &runtime.user),
            ("os", &runtime.os),
            ("pc_name", &runtime.pc_name),
            ("home_dir", &runtime.home_dir),
            ("datetime", &runtime.datetime),
        ])
    }

    async fn reason(&self, state: AgentState) -> Result<AgentState> {
        let options = GenerateOptions {
            temperature: Some(self.temperature),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            let response = self
                .llm
                .invoke(state.transcript().messages(), Some(options.clone()))
                .await?;

            match Directive::parse(&response.content) {
                Ok(directive) => {
                    if let Some(thought) = directive.thought().filter(|t| !t.is_empty()) {
                        self.narrate(&format!("Thinking: {}", thought)).await;
                    }
                    return Ok(state.reasoned(response.content, directive));
                }
                Err(e) if attempt < self.parse_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "orchestrator: {}; asking again", e);
                }
                Err(e) => {
                    tracing::warn!("orchestrator: {}; finishing", e);
                    return Ok(state.reasoned(response.content, Directive::default()));
                }
            }
        }
    }

    /// Hand the request to a fresh sub-agent and fold its answer back in
    async fn delegate(&self, state: AgentState, kind: AgentKind) -> AgentState {
        let request = state
            .directive()
            .request()
            .filter(|r| !r.is_empty())
            .unwrap_or(state.input())
            .to_string();
        self.narrate(&format!("Using {} to {}", kind, request)).await;

        let outcome = match self.factory.build(kind) {
            Ok(agent) => agent.invoke(&request).await,
            Err(e) => Err(e),
        };
        let response = outcome.unwrap_or_else(|e| {
            tracing::warn!(agent = %kind, "sub-agent failed: {}", e);
            format!("Error: {}", e)
        });

        self.narrate(&summarize_response(kind.display_name(), &response))
            .await;

        let observation = self
            .human
            .render(&[("agent", kind.display_name()), ("response", &response)]);
        state.delegated(observation)
    }

    fn finish(&self, state: AgentState) -> AgentState {
        let answer = if state.exhausted() {
            MAX_ITERATION_ANSWER.to_string()
        } else {
            let directive = state.directive();
            match directive.final_answer() {
                Some(answer) => answer.to_string(),
                // Unlabelled prose is taken as the answer
                None if directive.is_empty() => state
                    .transcript()
                    .provisional()
                    .map(|m| m.content.trim().to_string())
                    .unwrap_or_default(),
                None => String::new(),
            }
        };
        state.finished(None, answer)
    }

    /// Log and speak a progress message; speech failures are ignored
    async fn narrate(&self, text: &str) {
        tracing::info!("{}", text);
        if let Some(narrator) = &self.narrator {
            if let Err(e) = narrator.speak(text).await {
                tracing::warn!("narration failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::directive::Label;

    #[test]
    fn test_route_resolution() {
        let cases = [
            (vec![(Label::Route, "Agent"), (Label::AgentName, "Web Agent")], Route::Delegate(AgentKind::Web)),
            (vec![(Label::Route, "agent"), (Label::AgentName, "terminal")], Route::Delegate(AgentKind::Terminal)),
            (vec![(Label::Route, "System Agent")], Route::Delegate(AgentKind::System)),
            (vec![(Label::Route, "web")], Route::Delegate(AgentKind::Web)),
            (vec![(Label::Route, "Agent"), (Label::AgentName, "Email Agent")], Route::Final),
            (vec![(Label::Route, "Agent")], Route::Final),
            (vec![(Label::Route, "Final")], Route::Final),
            (vec![(Label::Route, "dance")], Route::Final),
            (vec![], Route::Final),
        ];

        for (fields, expected) in cases {
            let directive = Directive::from_fields(fields);
            assert_eq!(Route::resolve(&directive), expected, "{:?}", directive);
        }
    }
}
