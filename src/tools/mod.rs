//! Tools module - actions the sub-agents can take
//!
//! Contains the action registry and the terminal, browser and desktop
//! action sets.

pub mod browser;
pub mod desktop;
pub mod registry;
pub mod terminal;

pub use registry::{Action, ActionInput, Executable, Registry, TOOL_NOT_FOUND};
