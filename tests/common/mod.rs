//! Shared test doubles for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use conductor::agent::{AgentKind, SubAgent, SubAgentFactory};
use conductor::core::{Message, Result};
use conductor::llm::{GenerateOptions, LLMProvider, LLMResponse};
use conductor::ConductorError;

/// Model stub that replays scripted replies
///
/// When the script runs out the last reply repeats. Every transcript it is
/// shown is kept for inspection.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(String::new()),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// A stub that always gives the same reply
    pub fn always(reply: &str) -> Arc<Self> {
        Self::new(&[reply])
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Transcript passed to the n-th call
    pub fn transcript(&self, call: usize) -> Vec<Message> {
        self.seen.lock().unwrap()[call].clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn invoke(
        &self,
        messages: &[Message],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.replies.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(LLMResponse::text(last.clone(), "scripted"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Model stub that always fails
pub struct BrokenLlm;

#[async_trait]
impl LLMProvider for BrokenLlm {
    async fn invoke(
        &self,
        _messages: &[Message],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        Err(ConductorError::llm("connection refused"))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Sub-agent that answers with a fixed text and records its requests
pub struct CannedAgent {
    name: String,
    answer: std::result::Result<String, String>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SubAgent for CannedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &str) -> Result<String> {
        self.requests.lock().unwrap().push(request.to_string());
        self.answer.clone().map_err(ConductorError::tool)
    }
}

/// Factory that counts constructions per kind
pub struct CountingFactory {
    answer: std::result::Result<String, String>,
    pub built: Mutex<Vec<AgentKind>>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl CountingFactory {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(answer.to_string()),
            built: Mutex::new(Vec::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn failing(error: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(error.to_string()),
            built: Mutex::new(Vec::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn built(&self) -> Vec<AgentKind> {
        self.built.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl SubAgentFactory for CountingFactory {
    fn build(&self, kind: AgentKind) -> Result<Box<dyn SubAgent>> {
        self.built.lock().unwrap().push(kind);
        Ok(Box::new(CannedAgent {
            name: kind.display_name().to_string(),
            answer: self.answer.clone(),
            requests: Arc::clone(&self.requests),
        }))
    }
}
