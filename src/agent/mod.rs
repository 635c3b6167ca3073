//! Agent module - reasoning loops and their state
//!
//! The orchestrator and every sub-agent run the same shape of loop: ask the
//! model, parse a [`Directive`] from its reply, then act or finish within an
//! iteration budget.

pub mod directive;
pub mod kinds;
pub mod memory;
pub mod orchestrator;
pub mod prompt;
pub mod state;
pub mod sub_agent;
pub mod templates;
pub mod transcript;

pub use directive::{Directive, DirectiveError, Label, GRAMMAR_VERSION};
pub use kinds::{AgentKind, DefaultSubAgentFactory, SubAgentFactory};
pub use memory::{EpisodicMemory, FileMemory, Recollection};
pub use orchestrator::{Orchestrator, Route};
pub use state::{AgentState, Budget, MAX_ITERATION_ANSWER};
pub use sub_agent::{AgentPrompts, ReactAgent, SubAgent, SubAgentBuilder};
pub use transcript::Transcript;
