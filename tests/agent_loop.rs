//! Sub-agent loop integration tests
//!
//! Drives `ReactAgent` with scripted model replies and an in-memory tool set.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{BrokenLlm, ScriptedLlm};
use conductor::agent::{AgentPrompts, EpisodicMemory, FileMemory, ReactAgent, MAX_ITERATION_ANSWER};
use conductor::core::{Result, Role};
use conductor::tools::registry::required_str;
use conductor::tools::{Action, ActionInput, Executable, Registry};
use conductor::ConductorError;
use serde_json::json;

/// Context shared by the test actions
#[derive(Default)]
struct Notes {
    prefix: String,
}

struct Echo;

#[async_trait]
impl Executable<Notes> for Echo {
    async fn call(&self, input: ActionInput, notes: &Notes) -> Result<String> {
        Ok(format!("{}{}", notes.prefix, required_str(&input, "text")?))
    }
}

struct Explode;

#[async_trait]
impl Executable<Notes> for Explode {
    async fn call(&self, _input: ActionInput, _notes: &Notes) -> Result<String> {
        Err(ConductorError::tool("permission denied"))
    }
}

fn registry() -> Registry<Notes> {
    Registry::new(vec![
        Action::new(
            "echo",
            "Repeat the text back",
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}),
            Echo,
        ),
        Action::new("explode", "Always fails", json!({"type": "object"}), Explode),
    ])
}

fn agent(llm: Arc<ScriptedLlm>, max_iteration: usize) -> ReactAgent<Notes> {
    ReactAgent::builder("Test Agent")
        .llm(llm)
        .registry(registry())
        .context(Notes {
            prefix: "echo: ".into(),
        })
        .prompts(AgentPrompts::load(None, "test", "You are a test agent.\n\n").unwrap())
        .instructions(vec!["Be brief.".into(), "Never guess.".into()])
        .max_iteration(max_iteration)
        .build()
        .unwrap()
}

const FINAL: &str = "Thought: nothing to do\nRoute: Final\nFinal Answer: all good";
const ECHO: &str = "Thought: repeat\nRoute: Action\nAction Name: echo\nAction Input: {\"text\": \"ping\"}";

#[tokio::test]
async fn test_always_final_finishes_after_one_iteration() {
    let llm = ScriptedLlm::always(FINAL);
    let state = agent(llm.clone(), 10).run("check").await.unwrap();

    assert_eq!(state.output(), Some("all good"));
    assert_eq!(state.iteration(), 1);
    assert!(!state.exhausted());
    assert_eq!(llm.calls(), 1);
    assert_eq!(state.transcript().len(), 3);
    assert_eq!(
        state.transcript().last().unwrap().content,
        "Thought: nothing to do\nRoute: Final\nFinal Answer: all good"
    );
}

#[tokio::test]
async fn test_always_action_ends_at_budget_with_fallback() {
    let llm = ScriptedLlm::always(ECHO);
    let state = agent(llm.clone(), 3).run("loop forever").await.unwrap();

    assert_eq!(state.output(), Some(MAX_ITERATION_ANSWER));
    assert_eq!(state.iteration(), 3);
    assert!(state.exhausted());
    // Three actions plus the reply that found the budget spent
    assert_eq!(llm.calls(), 4);

    let transcript = state.transcript();
    assert_eq!(transcript.count_role(Role::System), 1);
    assert_eq!(transcript.count_role(Role::Human), 4);
    assert_eq!(transcript.count_role(Role::Ai), 4);
    assert!(transcript
        .last()
        .unwrap()
        .content
        .ends_with("Final Answer: Maximum Iteration reached."));
}

#[tokio::test]
async fn test_action_observation_is_fed_back() {
    let llm = ScriptedLlm::new(&[ECHO, FINAL]);
    agent(llm.clone(), 10).run("say ping").await.unwrap();

    let second = llm.transcript(1);
    assert_eq!(second.len(), 4);
    assert_eq!(second[1].content, "Task: say ping");
    assert_eq!(second[2].role, Role::Ai);
    assert!(second[2].content.contains("Action Name: echo"));
    assert_eq!(second[3].role, Role::Human);
    assert_eq!(second[3].content, "Observation: echo: ping");
}

#[tokio::test]
async fn test_unknown_tool_is_observed() {
    let llm = ScriptedLlm::new(&[
        "Thought: try it\nRoute: Action\nAction Name: teleport\nAction Input: {}",
        FINAL,
    ]);
    let state = agent(llm.clone(), 10).run("go").await.unwrap();

    assert_eq!(llm.transcript(1)[3].content, "Observation: Tool not found");
    assert_eq!(state.output(), Some("all good"));
}

#[tokio::test]
async fn test_failing_tool_message_is_observed() {
    let llm = ScriptedLlm::new(&[
        "Route: Action\nAction Name: explode\nAction Input: {}",
        FINAL,
    ]);
    agent(llm.clone(), 10).run("go").await.unwrap();

    assert_eq!(
        llm.transcript(1)[3].content,
        "Observation: Tool execution error: permission denied"
    );
}

#[tokio::test]
async fn test_model_failure_is_returned() {
    let agent = ReactAgent::builder("Broken Agent")
        .llm(Arc::new(BrokenLlm))
        .registry(registry())
        .context(Notes::default())
        .prompts(AgentPrompts::load(None, "test", "role\n").unwrap())
        .build()
        .unwrap();

    let err = agent.run("anything").await.unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_system_prompt_lists_actions_and_instructions() {
    let llm = ScriptedLlm::always(FINAL);
    agent(llm.clone(), 10).run("check").await.unwrap();

    let system = &llm.transcript(0)[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.starts_with("You are a test agent."));
    assert!(system.content.contains("1. Be brief.\n2. Never guess."));
    assert!(system.content.contains("### echo\nDescription: Repeat the text back"));
}

#[test]
fn test_actions_prompt_names_resolve_in_registry() {
    let registry = registry();
    let prompt = registry.actions_prompt();
    let names: Vec<&str> = prompt
        .lines()
        .filter_map(|line| line.strip_prefix("### "))
        .collect();

    assert_eq!(names, registry.names());
    for name in names {
        assert!(registry.get(name).is_some(), "{} missing", name);
    }
}

#[tokio::test]
async fn test_memory_is_recorded_and_recalled() {
    let dir = tempfile::tempdir().unwrap();
    let memory: Arc<dyn EpisodicMemory> =
        Arc::new(FileMemory::new(dir.path().join("memory.json"), 0.5));

    let build = |llm: Arc<ScriptedLlm>| {
        ReactAgent::builder("Memory Agent")
            .llm(llm)
            .registry(registry())
            .context(Notes::default())
            .prompts(AgentPrompts::load(None, "test", "role\n").unwrap())
            .memory(Some(Arc::clone(&memory)))
            .build()
            .unwrap()
    };

    let first = ScriptedLlm::new(&[ECHO, FINAL]);
    build(first.clone()).run("repeat the word ping").await.unwrap();
    assert!(!first.transcript(0)[0].content.contains("## Memory"));

    let second = ScriptedLlm::always(FINAL);
    build(second.clone()).run("repeat the word ping again").await.unwrap();
    let system = &second.transcript(0)[0].content;
    assert!(system.contains("## Memory of a similar past task"));
    assert!(system.contains("Task: repeat the word ping"));
}
