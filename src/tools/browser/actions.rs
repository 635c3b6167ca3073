//! Web agent actions over [`BrowserExecutor`]

use async_trait::async_trait;
use serde_json::json;

use crate::core::Result;
use crate::tools::browser::BrowserExecutor;
use crate::tools::registry::{optional_i64, required_str, Action, ActionInput, Executable};

struct Open;
struct Click;
struct Fill;
struct GetText;
struct TakeSnapshot;
struct Scroll;
struct Press;
struct Close;

#[async_trait]
impl Executable<BrowserExecutor> for Open {
    async fn call(&self, input: ActionInput, browser: &BrowserExecutor) -> Result<String> {
        let url = required_str(&input, "url")?;
        let url = if url.contains("://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        };
        browser.open(&url).await
    }
}

#[async_trait]
impl Executable<BrowserExecutor> for Click {
    async fn call(&self, input: ActionInput, browser: &BrowserExecutor) -> Result<String> {
        browser.click(required_str(&input, "ref")?).await
    }
}

#[async_trait]
impl Executable<BrowserExecutor> for Fill {
    async fn call(&self, input: ActionInput, browser: &BrowserExecutor) -> Result<String> {
        browser
            .fill(required_str(&input, "ref")?, required_str(&input, "text")?)
            .await
    }
}

#[async_trait]
impl Executable<BrowserExecutor> for GetText {
    async fn call(&self, input: ActionInput, browser: &BrowserExecutor) -> Result<String> {
        browser.get_text(required_str(&input, "ref")?).await
    }
}

#[async_trait]
impl Executable<BrowserExecutor> for TakeSnapshot {
    async fn call(&self, _input: ActionInput, browser: &BrowserExecutor) -> Result<String> {
        browser.snapshot().await
    }
}

#[async_trait]
impl Executable<BrowserExecutor> for Scroll {
    async fn call(&self, input: ActionInput, browser: &BrowserExecutor) -> Result<String> {
        let direction = required_str(&input, "direction")?;
        let pixels = optional_i64(&input, "pixels").and_then(|px| u32::try_from(px).ok());
        browser.scroll(direction, pixels).await
    }
}

#[async_trait]
impl Executable<BrowserExecutor> for Press {
    async fn call(&self, input: ActionInput, browser: &BrowserExecutor) -> Result<String> {
        browser.press(required_str(&input, "key")?).await
    }
}

#[async_trait]
impl Executable<BrowserExecutor> for Close {
    async fn call(&self, _input: ActionInput, browser: &BrowserExecutor) -> Result<String> {
        browser.close().await
    }
}

fn object(properties: serde_json::Value, required: &[&str]) -> serde_json::Value {
    json!({"type": "object", "properties": properties, "required": required})
}

/// Actions available to the web agent
pub fn web_actions() -> Vec<Action<BrowserExecutor>> {
    let element_ref = json!({"type": "string", "description": "Element ref from the latest snapshot, e.g. @e3"});
    vec![
        Action::new(
            "open",
            "Open a URL in the browser and return the page snapshot",
            object(json!({"url": {"type": "string"}}), &["url"]),
            Open,
        ),
        Action::new(
            "click",
            "Click an element and return the updated snapshot",
            object(json!({"ref": element_ref}), &["ref"]),
            Click,
        ),
        Action::new(
            "fill",
            "Clear an input field and type text into it",
            object(
                json!({"ref": element_ref, "text": {"type": "string"}}),
                &["ref", "text"],
            ),
            Fill,
        ),
        Action::new(
            "get_text",
            "Read the text content of an element",
            object(json!({"ref": element_ref}), &["ref"]),
            GetText,
        ),
        Action::new(
            "snapshot",
            "List the interactive elements of the current page",
            object(json!({}), &[]),
            TakeSnapshot,
        ),
        Action::new(
            "scroll",
            "Scroll the page",
            object(
                json!({
                    "direction": {"type": "string", "enum": ["up", "down", "left", "right"]},
                    "pixels": {"type": "integer"}
                }),
                &["direction"],
            ),
            Scroll,
        ),
        Action::new(
            "press",
            "Press a key such as Enter, Tab or Control+a",
            object(json!({"key": {"type": "string"}}), &["key"]),
            Press,
        ),
        Action::new("close", "Close the browser", object(json!({}), &[]), Close),
    ]
}
