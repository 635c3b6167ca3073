//! Browser automation integration tests
//!
//! Runs the web agent's actions against a real agent-browser session.

use conductor::core::config::BrowserConfig;
use conductor::tools::browser::{web_actions, BrowserExecutor};
use conductor::tools::Registry;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

/// Helper to create a headless executor for browser tests
async fn create_browser() -> Result<BrowserExecutor, Box<dyn std::error::Error>> {
    let browser = BrowserExecutor::from_config(&BrowserConfig {
        session_name: "conductor-test".to_string(),
        headed: false,
    });

    if !browser.is_available().await {
        return Err("agent-browser not available".into());
    }

    Ok(browser)
}

/// Test basic navigation
#[tokio::test]
#[ignore] // Requires agent-browser to be installed
async fn test_open_example_com() {
    let browser = match create_browser().await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Skipping test: {}", e);
            return;
        }
    };

    let registry = Registry::new(web_actions());
    let result = timeout(
        Duration::from_secs(60),
        registry.execute("open", json!({"url": "example.com"}), &browser),
    )
    .await
    .expect("open timed out");

    assert!(result.success, "open failed: {}", result.content);
    assert!(result.content.starts_with("Navigated to https://example.com"));

    let closed = registry.execute("close", json!({}), &browser).await;
    assert!(closed.success);
}

/// Test navigation + snapshot + text extraction
#[tokio::test]
#[ignore]
async fn test_snapshot_lists_link() {
    let browser = match create_browser().await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Skipping test: {}", e);
            return;
        }
    };

    let registry = Registry::new(web_actions());
    registry
        .execute("open", json!({"url": "https://example.com"}), &browser)
        .await;

    let snapshot = registry.execute("snapshot", json!({}), &browser).await;
    assert!(snapshot.success, "snapshot failed: {}", snapshot.content);
    assert!(snapshot.content.contains("link"));

    registry.execute("close", json!({}), &browser).await;
}
