//! Browser automation module
//!
//! Wraps agent-browser CLI for web automation.

mod actions;
mod executor;
mod snapshot;

pub use actions::web_actions;
pub use executor::BrowserExecutor;
pub use snapshot::{Element, Snapshot};
