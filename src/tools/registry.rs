//! Tool registry - maps action names to executables
//!
//! Every sub-agent owns one registry. The registry is the only way the model
//! learns which actions exist (through [`Registry::actions_prompt`]) and the
//! only way those actions run (through [`Registry::execute`]).
//!
//! `execute` never returns an error. Unknown names, malformed input, failing
//! executables and panicking executables all come back as an
//! [`ActionResult`] whose content describes the problem, so the model can
//! read it as an observation and correct itself.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;

use crate::core::{ActionResult, ConductorError, Result};

/// Content returned when a directive names an action that is not registered
pub const TOOL_NOT_FOUND: &str = "Tool not found";

/// Parameters supplied by the model for one action call
pub type ActionInput = serde_json::Map<String, Value>;

/// Read a required string parameter
pub fn required_str<'a>(input: &'a ActionInput, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ConductorError::tool(format!("missing string parameter '{}'", key)))
}

/// Read an optional string parameter
pub fn optional_str<'a>(input: &'a ActionInput, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

/// Read an optional integer parameter
pub fn optional_i64(input: &ActionInput, key: &str) -> Option<i64> {
    input.get(key).and_then(Value::as_i64)
}

/// Something an action can run
///
/// `C` is the execution context injected by the owning agent: a terminal
/// session, a desktop handle, a browser handle.
#[async_trait]
pub trait Executable<C>: Send + Sync {
    /// Run with the model-supplied parameters
    async fn call(&self, input: ActionInput, ctx: &C) -> Result<String>;
}

/// A registered action
pub struct Action<C> {
    /// Unique name the model refers to
    pub name: String,
    /// What the action does, shown to the model
    pub description: String,
    /// JSON Schema of the parameters
    pub params: Value,
    executable: Arc<dyn Executable<C>>,
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            params: self.params.clone(),
            executable: Arc::clone(&self.executable),
        }
    }
}

impl<C: Sync> Action<C> {
    /// Create a new action
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        params: Value,
        executable: impl Executable<C> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params,
            executable: Arc::new(executable),
        }
    }

    /// Render this action for the system prompt
    pub fn prompt(&self) -> String {
        let params = serde_json::to_string(&self.params).unwrap_or_else(|_| "{}".to_string());
        format!(
            "### {}\nDescription: {}\nParameters: {}",
            self.name, self.description, params
        )
    }
}

impl<C> std::fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Registry of available actions
pub struct Registry<C> {
    /// Actions in registration order
    actions: Vec<Action<C>>,
    /// Position of each action by name
    index: HashMap<String, usize>,
}

impl<C: Sync> Registry<C> {
    /// Build a registry; a repeated name replaces the earlier action
    pub fn new(actions: impl IntoIterator<Item = Action<C>>) -> Self {
        let mut registry = Self {
            actions: Vec::new(),
            index: HashMap::new(),
        };
        for action in actions {
            registry.register(action);
        }
        registry
    }

    /// Register one action (last write wins)
    pub fn register(&mut self, action: Action<C>) {
        match self.index.get(&action.name) {
            Some(&pos) => {
                tracing::debug!(action = %action.name, "replacing previously registered action");
                self.actions[pos] = action;
            }
            None => {
                self.index.insert(action.name.clone(), self.actions.len());
                self.actions.push(action);
            }
        }
    }

    /// Look up an action by name
    pub fn get(&self, name: &str) -> Option<&Action<C>> {
        self.index.get(name).map(|&pos| &self.actions[pos])
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Render every action into one block for the system prompt
    pub fn actions_prompt(&self) -> String {
        self.actions
            .iter()
            .map(Action::prompt)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Execute an action by name
    pub async fn execute(&self, name: &str, input: Value, ctx: &C) -> ActionResult {
        let Some(action) = self.get(name) else {
            return ActionResult::failure(name, TOOL_NOT_FOUND);
        };

        let input = match input {
            Value::Object(map) => map,
            Value::Null => ActionInput::new(),
            other => {
                return ActionResult::failure(
                    name,
                    format!("Action input must be a JSON object, got: {}", other),
                )
            }
        };

        let outcome = AssertUnwindSafe(action.executable.call(input, ctx))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(content)) => ActionResult::success(name, content),
            Ok(Err(e)) => ActionResult::failure(name, e.to_string()),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "action panicked".to_string());
                tracing::warn!(action = name, "action panicked: {}", message);
                ActionResult::failure(name, message)
            }
        }
    }
}

impl<C: Sync> Default for Registry<C> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
