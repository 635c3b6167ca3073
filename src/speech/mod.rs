//! Speech narration
//!
//! The orchestrator narrates its progress through a [`Narrator`]. Narration
//! is a side channel: callers log a failed `speak` and carry on.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::core::config::SpeechConfig;
use crate::core::{ConductorError, Result};

/// Responses longer than this are only called detailed in summaries
const DETAILED_RESPONSE_CHARS: usize = 200;

/// Length of the excerpt spoken for short responses
const EXCERPT_CHARS: usize = 100;

/// Speaks text aloud
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Speak `text`, returning once playback has finished
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Narrator that runs an external text-to-speech command
#[derive(Debug, Clone)]
pub struct CommandNarrator {
    command: String,
    args: Vec<String>,
}

impl CommandNarrator {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }
}

#[async_trait]
impl Narrator for CommandNarrator {
    async fn speak(&self, text: &str) -> Result<()> {
        let text = clean_text(text);
        if text.is_empty() {
            return Ok(());
        }

        // Text goes on stdin so a leading '-' is never read as an option
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| ConductorError::speech(format!("failed to run {}: {}", self.command, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConductorError::speech(format!("{} stdin is unavailable", self.command)))?;
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|e| ConductorError::speech(format!("failed to write to {}: {}", self.command, e)))?;
        drop(stdin);

        let status = child
            .wait()
            .await
            .map_err(|e| ConductorError::speech(format!("{} did not finish: {}", self.command, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(ConductorError::speech(format!("{} exited with {}", self.command, status)))
        }
    }
}

/// Build the configured narrator, if speech is enabled
pub fn narrator_from_config(config: &SpeechConfig) -> Option<Arc<dyn Narrator>> {
    config
        .enabled
        .then(|| Arc::new(CommandNarrator::from_config(config)) as Arc<dyn Narrator>)
}

fn patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ANSI pattern"),
            Regex::new(r"https?://\S+").expect("valid URL pattern"),
        )
    })
}

/// Make text fit for speech: no escape codes, URLs or code fences
pub fn clean_text(text: &str) -> String {
    let (ansi, url) = patterns();
    let text = ansi.replace_all(text, "");
    let text = url.replace_all(&text, "URL");
    text.replace("```", "").trim().to_string()
}

/// Spoken summary of a sub-agent's response
pub fn summarize_response(agent: &str, response: &str) -> String {
    let mut summary = format!("{} completed the task.", agent);
    if response.chars().count() > DETAILED_RESPONSE_CHARS {
        summary.push_str(" The response is quite detailed.");
    } else {
        let excerpt: String = response.chars().take(EXCERPT_CHARS).collect();
        summary.push_str(&format!(" Response: {}", excerpt));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("\x1b[1;32mDone\x1b[0m see https://example.com/a?b=1 now"),
            "Done see URL now"
        );
        assert_eq!(clean_text("```\nls -la\n```"), "ls -la");
    }

    #[test]
    fn test_summarize_short_response() {
        assert_eq!(
            summarize_response("Web Agent", "It is sunny."),
            "Web Agent completed the task. Response: It is sunny."
        );
        let long = "é".repeat(150);
        let summary = summarize_response("Terminal Agent", &long);
        assert_eq!(summary.chars().count(), "Terminal Agent completed the task. Response: ".chars().count() + 100);
    }

    #[test]
    fn test_summarize_detailed_response() {
        let summary = summarize_response("System Agent", &"x".repeat(201));
        assert_eq!(summary, "System Agent completed the task. The response is quite detailed.");
    }

    #[test]
    fn test_disabled_speech_has_no_narrator() {
        let config = SpeechConfig {
            enabled: false,
            command: "espeak".into(),
            args: vec![],
        };
        assert!(narrator_from_config(&config).is_none());
    }

    #[tokio::test]
    async fn test_text_is_passed_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spoken.txt");
        let narrator = CommandNarrator::new(
            "sh",
            vec!["-c".into(), format!("cat > '{}'", out.display())],
        );

        narrator.speak("-w /tmp/conductor-owned.wav hello").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "-w /tmp/conductor-owned.wav hello"
        );
    }

    #[tokio::test]
    async fn test_missing_command_is_speech_error() {
        let narrator = CommandNarrator::new("conductor-no-such-tts", vec![]);
        assert!(matches!(
            narrator.speak("hello").await,
            Err(ConductorError::Speech(_))
        ));
    }
}
