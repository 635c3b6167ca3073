//! Desktop control for the system agent
//!
//! The system agent acts through the [`Desktop`] trait. [`XdotoolDesktop`]
//! drives an X11 session with `xdotool`; tests substitute their own.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use crate::core::config::DesktopConfig;
use crate::core::{ConductorError, Result};
use crate::tools::registry::{
    optional_i64, optional_str, required_str, Action, ActionInput, Executable,
};

/// Mouse buttons the system agent may press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "middle" => Ok(MouseButton::Middle),
            "right" => Ok(MouseButton::Right),
            other => Err(ConductorError::desktop(format!("unknown mouse button '{}'", other))),
        }
    }

    /// xdotool button number
    fn number(&self) -> &'static str {
        match self {
            MouseButton::Left => "1",
            MouseButton::Middle => "2",
            MouseButton::Right => "3",
        }
    }
}

/// Desktop automation backend
#[async_trait]
pub trait Desktop: Send + Sync {
    /// Start an application, or open a file or URL
    async fn launch(&self, target: &str) -> Result<String>;
    async fn click(&self, x: i64, y: i64, button: MouseButton, clicks: u32) -> Result<String>;
    async fn type_text(&self, text: &str) -> Result<String>;
    /// Press a key combination such as `ctrl+s`
    async fn key(&self, keys: &str) -> Result<String>;
    async fn scroll(&self, direction: &str, amount: u32) -> Result<String>;
    /// Describe the active window, the pointer and the screen
    async fn state(&self) -> Result<String>;
}

/// `xdotool` backed desktop
#[derive(Debug, Clone)]
pub struct XdotoolDesktop {
    xdotool: String,
    opener: String,
}

impl XdotoolDesktop {
    pub fn from_config(config: &DesktopConfig) -> Self {
        Self {
            xdotool: config.xdotool.clone(),
            opener: config.opener.clone(),
        }
    }

    async fn xdotool(&self, args: &[&str]) -> Result<String> {
        tracing::debug!(?args, "xdotool");
        let output = Command::new(&self.xdotool)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ConductorError::desktop(format!("failed to run {}: {}", self.xdotool, e)))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(ConductorError::desktop(format!(
                "{} {} failed: {}",
                self.xdotool,
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// Whether `target` should go through the opener rather than run directly
fn is_openable(target: &str) -> bool {
    target.contains("://") || target.contains('/') || target.contains('.')
}

#[async_trait]
impl Desktop for XdotoolDesktop {
    async fn launch(&self, target: &str) -> Result<String> {
        let (program, args): (&str, Vec<&str>) = if is_openable(target) {
            (self.opener.as_str(), vec![target])
        } else {
            let mut parts = target.split_whitespace();
            let program = parts
                .next()
                .ok_or_else(|| ConductorError::desktop("nothing to launch"))?;
            (program, parts.collect())
        };

        Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ConductorError::desktop(format!("failed to launch {}: {}", target, e)))?;

        Ok(format!("Launched {}", target))
    }

    async fn click(&self, x: i64, y: i64, button: MouseButton, clicks: u32) -> Result<String> {
        let (x_str, y_str, repeat) = (x.to_string(), y.to_string(), clicks.max(1).to_string());
        self.xdotool(&[
            "mousemove",
            &x_str,
            &y_str,
            "click",
            "--repeat",
            &repeat,
            button.number(),
        ])
        .await?;
        Ok(format!("Clicked {:?} x{} at ({}, {})", button, clicks.max(1), x, y))
    }

    async fn type_text(&self, text: &str) -> Result<String> {
        self.xdotool(&["type", "--delay", "20", "--", text]).await?;
        Ok(format!("Typed '{}'", text))
    }

    async fn key(&self, keys: &str) -> Result<String> {
        self.xdotool(&["key", "--", keys]).await?;
        Ok(format!("Pressed {}", keys))
    }

    async fn scroll(&self, direction: &str, amount: u32) -> Result<String> {
        let button = match direction.trim().to_lowercase().as_str() {
            "up" => "4",
            "down" => "5",
            "left" => "6",
            "right" => "7",
            other => {
                return Err(ConductorError::desktop(format!(
                    "unknown scroll direction '{}'",
                    other
                )))
            }
        };
        let repeat = amount.max(1).to_string();
        self.xdotool(&["click", "--repeat", &repeat, button]).await?;
        Ok(format!("Scrolled {} by {}", direction, amount.max(1)))
    }

    async fn state(&self) -> Result<String> {
        let window = self
            .xdotool(&["getactivewindow", "getwindowname"])
            .await
            .unwrap_or_else(|_| "(none)".to_string());
        let pointer = self.xdotool(&["getmouselocation"]).await?;
        let screen = self.xdotool(&["getdisplaygeometry"]).await?;
        Ok(format!(
            "Active window: {}\nPointer: {}\nScreen size: {}",
            window, pointer, screen
        ))
    }
}

/// Context of the system agent
pub type DesktopHandle = Arc<dyn Desktop>;

struct Launch;
struct Click;
struct Type;
struct Key;
struct Scroll;
struct State;

fn coordinate(input: &ActionInput, key: &str) -> Result<i64> {
    optional_i64(input, key)
        .ok_or_else(|| ConductorError::tool(format!("missing integer parameter '{}'", key)))
}

#[async_trait]
impl Executable<DesktopHandle> for Launch {
    async fn call(&self, input: ActionInput, desktop: &DesktopHandle) -> Result<String> {
        desktop.launch(required_str(&input, "name")?).await
    }
}

#[async_trait]
impl Executable<DesktopHandle> for Click {
    async fn call(&self, input: ActionInput, desktop: &DesktopHandle) -> Result<String> {
        let button = MouseButton::parse(optional_str(&input, "button").unwrap_or("left"))?;
        let clicks = optional_i64(&input, "clicks")
            .and_then(|c| u32::try_from(c).ok())
            .unwrap_or(1);
        desktop
            .click(coordinate(&input, "x")?, coordinate(&input, "y")?, button, clicks)
            .await
    }
}

#[async_trait]
impl Executable<DesktopHandle> for Type {
    async fn call(&self, input: ActionInput, desktop: &DesktopHandle) -> Result<String> {
        desktop.type_text(required_str(&input, "text")?).await
    }
}

#[async_trait]
impl Executable<DesktopHandle> for Key {
    async fn call(&self, input: ActionInput, desktop: &DesktopHandle) -> Result<String> {
        desktop.key(required_str(&input, "keys")?).await
    }
}

#[async_trait]
impl Executable<DesktopHandle> for Scroll {
    async fn call(&self, input: ActionInput, desktop: &DesktopHandle) -> Result<String> {
        let amount = optional_i64(&input, "amount")
            .and_then(|a| u32::try_from(a).ok())
            .unwrap_or(3);
        desktop
            .scroll(required_str(&input, "direction")?, amount)
            .await
    }
}

#[async_trait]
impl Executable<DesktopHandle> for State {
    async fn call(&self, _input: ActionInput, desktop: &DesktopHandle) -> Result<String> {
        desktop.state().await
    }
}

/// Actions available to the system agent
pub fn desktop_actions() -> Vec<Action<DesktopHandle>> {
    vec![
        Action::new(
            "launch",
            "Start an application by command name, or open a file or URL with the default application",
            json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]}),
            Launch,
        ),
        Action::new(
            "click",
            "Click at screen coordinates",
            json!({
                "type": "object",
                "properties": {
                    "x": {"type": "integer"},
                    "y": {"type": "integer"},
                    "button": {"type": "string", "enum": ["left", "middle", "right"]},
                    "clicks": {"type": "integer"}
                },
                "required": ["x", "y"]
            }),
            Click,
        ),
        Action::new(
            "type",
            "Type text into the focused window",
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}),
            Type,
        ),
        Action::new(
            "key",
            "Press a key or key combination, e.g. Return or ctrl+s",
            json!({"type": "object", "properties": {"keys": {"type": "string"}}, "required": ["keys"]}),
            Key,
        ),
        Action::new(
            "scroll",
            "Scroll the window under the pointer",
            json!({
                "type": "object",
                "properties": {
                    "direction": {"type": "string", "enum": ["up", "down", "left", "right"]},
                    "amount": {"type": "integer"}
                },
                "required": ["direction"]
            }),
            Scroll,
        ),
        Action::new(
            "state",
            "Describe the active window, pointer position and screen size",
            json!({"type": "object", "properties": {}}),
            State,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::Registry;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Desktop for Recorder {
        async fn launch(&self, target: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("launch {}", target));
            Ok("ok".into())
        }
        async fn click(&self, x: i64, y: i64, button: MouseButton, clicks: u32) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("click {} {} {:?} {}", x, y, button, clicks));
            Ok("ok".into())
        }
        async fn type_text(&self, text: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("type {}", text));
            Ok("ok".into())
        }
        async fn key(&self, keys: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("key {}", keys));
            Ok("ok".into())
        }
        async fn scroll(&self, direction: &str, amount: u32) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("scroll {} {}", direction, amount));
            Ok("ok".into())
        }
        async fn state(&self) -> Result<String> {
            Ok("Active window: Terminal".into())
        }
    }

    #[tokio::test]
    async fn test_actions_reach_desktop() {
        let recorder = Arc::new(Recorder::default());
        let handle: DesktopHandle = recorder.clone();
        let registry = Registry::new(desktop_actions());

        registry.execute("launch", json!({"name": "gedit"}), &handle).await;
        registry
            .execute("click", json!({"x": 10, "y": 20, "button": "right"}), &handle)
            .await;
        registry.execute("type", json!({"text": "hi"}), &handle).await;
        registry.execute("key", json!({"keys": "ctrl+s"}), &handle).await;
        registry.execute("scroll", json!({"direction": "down"}), &handle).await;
        let state = registry.execute("state", json!({}), &handle).await;

        assert_eq!(state.content, "Active window: Terminal");
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec![
                "launch gedit",
                "click 10 20 Right 1",
                "type hi",
                "key ctrl+s",
                "scroll down 3"
            ]
        );
    }

    #[tokio::test]
    async fn test_click_requires_coordinates() {
        let handle: DesktopHandle = Arc::new(Recorder::default());
        let registry = Registry::new(desktop_actions());
        let result = registry.execute("click", json!({"x": 1}), &handle).await;
        assert!(!result.success);
        assert!(result.content.contains("'y'"));
    }

    #[test]
    fn test_button_and_opener_rules() {
        assert_eq!(MouseButton::parse("Right").unwrap(), MouseButton::Right);
        assert!(MouseButton::parse("fourth").is_err());
        assert!(is_openable("https://example.com"));
        assert!(is_openable("~/notes.txt"));
        assert!(!is_openable("firefox"));
    }
}
