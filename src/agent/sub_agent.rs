//! Sub-agent support
//!
//! A sub-agent is a full reason/act loop over its own tool registry. The
//! orchestrator only sees the [`SubAgent`] trait: hand it a request, get an
//! answer back.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::directive::Directive;
use crate::agent::memory::EpisodicMemory;
use crate::agent::prompt::{load_template, PromptTemplate, RuntimeContext};
use crate::agent::state::{AgentState, Budget, MAX_ITERATION_ANSWER, MAX_ITERATION_THOUGHT};
use crate::agent::templates;
use crate::core::{ActionResult, Config, ConductorError, Result};
use crate::llm::{GenerateOptions, LLMProvider, TokenUsage};
use crate::tools::registry::Registry;

/// An agent the orchestrator can delegate to
#[async_trait]
pub trait SubAgent: Send + Sync {
    /// Display name, e.g. "Terminal Agent"
    fn name(&self) -> &str;

    /// Work on a request until a final answer is reached
    async fn invoke(&self, request: &str) -> Result<String>;
}

/// Next step chosen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Action,
    Final,
}

impl Step {
    /// `action` in any case continues the loop; anything else finishes it
    fn from_route(route: Option<&str>) -> Self {
        match route {
            Some(r) if r.trim().eq_ignore_ascii_case("action") => Step::Action,
            _ => Step::Final,
        }
    }
}

/// The four templates a sub-agent renders
#[derive(Debug, Clone)]
pub struct AgentPrompts {
    pub system: PromptTemplate,
    pub action: PromptTemplate,
    pub observation: PromptTemplate,
    pub answer: PromptTemplate,
}

impl AgentPrompts {
    /// Built-in templates with `role` as the system text, each overridable
    /// from `<dir>/<agent>/<name>.md`
    pub fn load(dir: Option<&Path>, agent: &str, role: &str) -> Result<Self> {
        Ok(Self {
            system: load_template(
                dir,
                agent,
                "system",
                &templates::sub_agent_system(role),
                templates::SUB_AGENT_SYSTEM_PARAMS,
            )?,
            action: load_template(dir, agent, "action", templates::ACTION, templates::ACTION_PARAMS)?,
            observation: load_template(
                dir,
                agent,
                "observation",
                templates::OBSERVATION,
                templates::OBSERVATION_PARAMS,
            )?,
            answer: load_template(dir, agent, "answer", templates::ANSWER, templates::ANSWER_PARAMS)?,
        })
    }
}

/// Render instructions as a numbered list
pub fn format_instructions(instructions: &[String]) -> String {
    instructions
        .iter()
        .enumerate()
        .map(|(i, instruction)| format!("{}. {}", i + 1, instruction))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A reason/act agent over a registry of actions with context `C`
pub struct ReactAgent<C> {
    name: String,
    description: String,
    llm: Arc<dyn LLMProvider>,
    registry: Registry<C>,
    context: C,
    prompts: AgentPrompts,
    max_iteration: usize,
    parse_retries: usize,
    temperature: f32,
    token_usage: bool,
    instructions: String,
    use_vision: bool,
    memory: Option<Arc<dyn EpisodicMemory>>,
}

/// Builder for creating ReactAgents
pub struct SubAgentBuilder<C> {
    name: String,
    description: String,
    llm: Option<Arc<dyn LLMProvider>>,
    registry: Registry<C>,
    context: Option<C>,
    prompts: Option<AgentPrompts>,
    max_iteration: usize,
    parse_retries: usize,
    temperature: f32,
    token_usage: bool,
    instructions: Vec<String>,
    use_vision: bool,
    memory: Option<Arc<dyn EpisodicMemory>>,
}

impl<C: Send + Sync + 'static> SubAgentBuilder<C> {
    /// Create a new builder with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            llm: None,
            registry: Registry::default(),
            context: None,
            prompts: None,
            max_iteration: 10,
            parse_retries: 0,
            temperature: 0.0,
            token_usage: false,
            instructions: Vec::new(),
            use_vision: false,
            memory: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the model backend
    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the actions this agent may take
    pub fn registry(mut self, registry: Registry<C>) -> Self {
        self.registry = registry;
        self
    }

    /// Set the context passed to every action
    pub fn context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    pub fn prompts(mut self, prompts: AgentPrompts) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Set the iteration budget
    pub fn max_iteration(mut self, max: usize) -> Self {
        self.max_iteration = max;
        self
    }

    pub fn parse_retries(mut self, retries: usize) -> Self {
        self.parse_retries = retries;
        self
    }

    pub fn instructions(mut self, instructions: Vec<String>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn memory(mut self, memory: Option<Arc<dyn EpisodicMemory>>) -> Self {
        self.memory = memory;
        self
    }

    /// Apply the `[agent]` section of the configuration
    pub fn config(mut self, config: &Config) -> Self {
        self.max_iteration = config.agent.max_iteration;
        self.parse_retries = config.agent.parse_retries;
        self.temperature = config.agent.temperature;
        self.token_usage = config.agent.token_usage;
        self.instructions = config.agent.instructions.clone();
        self.use_vision = config.agent.use_vision;
        self
    }

    /// Build the agent
    pub fn build(self) -> Result<ReactAgent<C>> {
        let llm = self
            .llm
            .ok_or_else(|| ConductorError::config(format!("{}: no model backend", self.name)))?;
        let context = self
            .context
            .ok_or_else(|| ConductorError::config(format!("{}: no action context", self.name)))?;
        let prompts = self
            .prompts
            .ok_or_else(|| ConductorError::config(format!("{}: no prompt templates", self.name)))?;
        if self.max_iteration == 0 {
            return Err(ConductorError::config(format!(
                "{}: max_iteration must be at least 1",
                self.name
            )));
        }

        Ok(ReactAgent {
            name: self.name,
            description: self.description,
            llm,
            registry: self.registry,
            context,
            prompts,
            max_iteration: self.max_iteration,
            parse_retries: self.parse_retries,
            temperature: self.temperature,
            token_usage: self.token_usage,
            instructions: format_instructions(&self.instructions),
            use_vision: self.use_vision,
            memory: self.memory,
        })
    }
}

impl<C: Send + Sync + 'static> ReactAgent<C> {
    /// Create a builder
    pub fn builder(name: impl Into<String>) -> SubAgentBuilder<C> {
        SubAgentBuilder::new(name)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    /// Render the system prompt for a run starting now
    pub fn system_prompt(&self) -> String {
        let runtime = RuntimeContext::detect();
        let actions_prompt = self.registry.actions_prompt();
        self.prompts.system.render(&[
            ("instructions", &self.instructions),
            ("current_datetime", &runtime.datetime),
            ("actions_prompt", &actions_prompt),
            ("os", &runtime.os),
            ("home_dir", &runtime.home_dir),
            ("user", &runtime.user),
            ("vision", templates::vision_hint(self.use_vision)),
        ])
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: Some(self.temperature),
            ..Default::default()
        }
    }

    /// Run the loop and return the final state
    pub async fn run(&self, input: &str) -> Result<AgentState> {
        tracing::info!(agent = %self.name, "entering {}", self.name);

        let mut system_prompt = self.system_prompt();
        if let Some(memory) = &self.memory {
            match memory.retrieve(input).await {
                Ok(Some(recollection)) => {
                    tracing::debug!(agent = %self.name, task = %recollection.task, "attaching episodic memory");
                    system_prompt = recollection.attach(&system_prompt);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(agent = %self.name, "memory lookup failed: {}", e),
            }
        }

        let mut usage = TokenUsage::default();
        let mut state = AgentState::new(input, system_prompt, format!("Task: {}", input));

        loop {
            state = self.reason(state, &mut usage).await?;

            let (next, budget) = state.controller(self.max_iteration);
            state = next;
            let step = match budget {
                Budget::Within => Step::from_route(state.directive().route()),
                Budget::Exhausted => Step::Final,
            };

            match step {
                Step::Action => {
                    state = self.action(state).await;
                    if self.token_usage {
                        tracing::info!(
                            agent = %self.name,
                            input_tokens = usage.prompt_tokens,
                            output_tokens = usage.completion_tokens,
                            total_tokens = usage.total_tokens,
                            "token usage"
                        );
                    }
                }
                Step::Final => {
                    state = self.finish(state);
                    break;
                }
            }
        }

        if let Some(memory) = &self.memory {
            if let Err(e) = memory.store(input, state.transcript().messages()).await {
                tracing::warn!(agent = %self.name, "memory store failed: {}", e);
            }
        }

        Ok(state)
    }

    /// Ask the model for the next directive, re-asking on replies without one
    async fn reason(&self, state: AgentState, usage: &mut TokenUsage) -> Result<AgentState> {
        let mut attempt = 0;
        loop {
            let response = self
                .llm
                .invoke(state.transcript().messages(), Some(self.options()))
                .await?;
            if let Some(u) = response.usage {
                *usage += u;
            }

            match Directive::parse(&response.content) {
                Ok(directive) => {
                    if let Some(thought) = directive.thought() {
                        tracing::info!(agent = %self.name, "Thought: {}", thought);
                    }
                    return Ok(state.reasoned(response.content, directive));
                }
                Err(e) if attempt < self.parse_retries => {
                    attempt += 1;
                    tracing::warn!(agent = %self.name, attempt, "{}; asking again", e);
                }
                Err(e) => {
                    tracing::warn!(agent = %self.name, "{}; finishing", e);
                    return Ok(state.reasoned(response.content, Directive::default()));
                }
            }
        }
    }

    async fn action(&self, state: AgentState) -> AgentState {
        let directive = state.directive();
        let thought = directive.thought().unwrap_or_default().to_string();
        let route = directive.route().unwrap_or("Action").to_string();
        let name = directive.action_name().unwrap_or_default().to_string();

        let (input_text, result) = match directive.action_input() {
            Ok(input) => {
                let text = serde_json::to_string_pretty(&input).unwrap_or_else(|_| input.to_string());
                tracing::info!(agent = %self.name, action = %name, input = %text, "Action");
                let result = self.registry.execute(&name, input, &self.context).await;
                (text, result)
            }
            Err(e) => {
                let raw = directive
                    .get(crate::agent::directive::Label::ActionInput)
                    .unwrap_or_default()
                    .to_string();
                (raw, ActionResult::failure(&name, e.to_string()))
            }
        };

        tracing::info!(agent = %self.name, success = result.success, "Observation: {}", result.content);

        let record = self.prompts.action.render(&[
            ("thought", &thought),
            ("action_name", &name),
            ("action_input", &input_text),
            ("route", &route),
        ]);
        let observation = self
            .prompts
            .observation
            .render(&[("observation", &result.content)]);

        state.acted(record, observation)
    }

    fn finish(&self, state: AgentState) -> AgentState {
        let (thought, answer) = if state.exhausted() {
            (MAX_ITERATION_THOUGHT.to_string(), MAX_ITERATION_ANSWER.to_string())
        } else {
            let directive = state.directive();
            let answer = match directive.final_answer() {
                Some(answer) => answer.to_string(),
                // Unlabelled prose is taken as the answer
                None if directive.is_empty() => state
                    .transcript()
                    .provisional()
                    .map(|m| m.content.trim().to_string())
                    .unwrap_or_default(),
                None => String::new(),
            };
            (directive.thought().unwrap_or_default().to_string(), answer)
        };

        tracing::info!(agent = %self.name, "Final Answer: {}", answer);
        let record = self
            .prompts
            .answer
            .render(&[("thought", &thought), ("final_answer", &answer)]);
        state.finished(Some(record), answer)
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> SubAgent for ReactAgent<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &str) -> Result<String> {
        Ok(self.run(request).await?.into_output())
    }
}
