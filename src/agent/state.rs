//! Agent loop state
//!
//! One [`AgentState`] record is threaded through a reasoning loop. Every
//! transition consumes the record and returns the next one, so no step can
//! hold on to a stale view of the transcript.

use crate::agent::directive::Directive;
use crate::agent::transcript::Transcript;
use crate::core::Message;

/// Answer used when the iteration budget runs out
pub const MAX_ITERATION_ANSWER: &str = "Maximum Iteration reached.";

/// Thought recorded alongside [`MAX_ITERATION_ANSWER`]
pub const MAX_ITERATION_THOUGHT: &str = "Looks like I have reached the maximum iteration limit.";

/// Outcome of the controller's budget check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// The directive's route is followed
    Within,
    /// The loop must finish regardless of the route
    Exhausted,
}

/// State of one agent invocation
#[derive(Debug, Clone)]
pub struct AgentState {
    input: String,
    transcript: Transcript,
    directive: Directive,
    iteration: usize,
    exhausted: bool,
    output: Option<String>,
}

impl AgentState {
    /// Initial state: system prompt plus the task message
    pub fn new(
        input: impl Into<String>,
        system_prompt: impl Into<String>,
        task_message: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            transcript: Transcript::new(system_prompt, task_message),
            directive: Directive::default(),
            iteration: 0,
            exhausted: false,
            output: None,
        }
    }

    /// Reason: stage the raw reply and make its directive the active one
    pub fn reasoned(mut self, reply: impl Into<String>, directive: Directive) -> Self {
        self.transcript.stage(Message::ai(reply));
        self.directive = directive;
        self
    }

    /// Controller: spend one iteration, or report that none are left
    pub fn controller(mut self, max_iteration: usize) -> (Self, Budget) {
        if self.iteration < max_iteration {
            self.iteration += 1;
            (self, Budget::Within)
        } else {
            self.exhausted = true;
            (self, Budget::Exhausted)
        }
    }

    /// Action: replace the staged reply with the action record and observation
    pub fn acted(mut self, record: impl Into<String>, observation: impl Into<String>) -> Self {
        self.transcript
            .replace_provisional([Message::ai(record), Message::human(observation)]);
        self
    }

    /// Delegation: keep the staged reply and append the sub-agent's observation
    pub fn delegated(mut self, observation: impl Into<String>) -> Self {
        self.transcript
            .commit_provisional([Message::human(observation)]);
        self
    }

    /// Final: record the answer
    ///
    /// With a closing record the staged reply is replaced by it; without one
    /// the staged reply is kept.
    pub fn finished(mut self, closing: Option<String>, answer: impl Into<String>) -> Self {
        match closing {
            Some(record) => {
                self.transcript.replace_provisional([Message::ai(record)]);
            }
            None => self.transcript.commit_provisional(std::iter::empty()),
        }
        self.output = Some(answer.into());
        self
    }

    /// The task text this invocation was started with
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Directive parsed from the latest reply
    pub fn directive(&self) -> &Directive {
        &self.directive
    }

    /// Iterations spent so far
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Whether the controller forced the final step
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn into_output(self) -> String {
        self.output.unwrap_or_default()
    }
}
