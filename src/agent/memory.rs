//! Episodic memory
//!
//! Sub-agents may consult a store of past runs before they start and hand
//! their transcript to it when they finish. The store is best effort: the
//! loop logs and ignores every failure.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::{ConductorError, Message, Result, Role};

/// Oldest records are dropped past this many
const MAX_RECORDS: usize = 200;

/// A relevant past run
#[derive(Debug, Clone, PartialEq)]
pub struct Recollection {
    /// Task the past run worked on
    pub task: String,
    /// What happened
    pub summary: String,
    /// Keyword overlap with the current task, 0.0 to 1.0
    pub relevance: f32,
}

impl Recollection {
    /// Append this recollection to a system prompt
    pub fn attach(&self, system_prompt: &str) -> String {
        format!(
            "{}\n\n## Memory of a similar past task\nTask: {}\n{}",
            system_prompt.trim_end(),
            self.task,
            self.summary
        )
    }
}

/// Store of past runs
#[async_trait]
pub trait EpisodicMemory: Send + Sync {
    /// Find the most relevant past run for `task`
    async fn retrieve(&self, task: &str) -> Result<Option<Recollection>>;

    /// Record a finished run
    async fn store(&self, task: &str, transcript: &[Message]) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoryRecord {
    task: String,
    summary: String,
    created_at: DateTime<Utc>,
}

/// JSON file backed memory
pub struct FileMemory {
    path: PathBuf,
    min_relevance: f32,
    lock: Mutex<()>,
}

fn keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Share of the task's keywords found in the other text
fn relevance(task: &BTreeSet<String>, other: &str) -> f32 {
    if task.is_empty() {
        return 0.0;
    }
    let other = keywords(other);
    task.intersection(&other).count() as f32 / task.len() as f32
}

/// Summarize a transcript: the steps taken and the closing message
fn summarize(transcript: &[Message]) -> String {
    let ai: Vec<&Message> = transcript.iter().filter(|m| m.role == Role::Ai).collect();
    let steps = ai.len().saturating_sub(1);
    let outcome = ai.last().map(|m| m.content.trim()).unwrap_or("(no outcome)");
    format!("Steps taken: {}\nOutcome:\n{}", steps, outcome)
}

impl FileMemory {
    pub fn new(path: impl Into<PathBuf>, min_relevance: f32) -> Self {
        Self {
            path: path.into(),
            min_relevance,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_records(&self) -> Result<Vec<MemoryRecord>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| ConductorError::memory(format!("corrupt store: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl EpisodicMemory for FileMemory {
    async fn retrieve(&self, task: &str) -> Result<Option<Recollection>> {
        let _guard = self.lock.lock().await;
        let wanted = keywords(task);

        let best = self
            .read_records()
            .await?
            .into_iter()
            .map(|r| (relevance(&wanted, &r.task), r))
            .filter(|(score, _)| *score >= self.min_relevance && *score > 0.0)
            .max_by(|(a, ra), (b, rb)| {
                a.total_cmp(b).then_with(|| ra.created_at.cmp(&rb.created_at))
            });

        Ok(best.map(|(score, record)| Recollection {
            task: record.task,
            summary: record.summary,
            relevance: score,
        }))
    }

    async fn store(&self, task: &str, transcript: &[Message]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_records().await?;

        records.push(MemoryRecord {
            task: task.to_string(),
            summary: summarize(transcript),
            created_at: Utc::now(),
        });
        if records.len() > MAX_RECORDS {
            let excess = records.len() - MAX_RECORDS;
            records.drain(..excess);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&self.path, content).await?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "stored episode");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(answer: &str) -> Vec<Message> {
        vec![
            Message::system("sys"),
            Message::human("Task: x"),
            Message::ai("Action Name: shell"),
            Message::human("Observation: ok"),
            Message::ai(answer),
        ]
    }

    #[tokio::test]
    async fn test_store_then_retrieve_relevant() {
        let dir = tempfile::tempdir().unwrap();
        let memory = FileMemory::new(dir.path().join("nested").join("memory.json"), 0.5);

        memory
            .store("list large files in downloads", &transcript("Final Answer: 3 files"))
            .await
            .unwrap();

        let hit = memory
            .retrieve("find large files in my downloads folder")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.task, "list large files in downloads");
        assert!(hit.summary.contains("Steps taken: 1"));
        assert!(hit.summary.contains("Final Answer: 3 files"));
        assert!(hit.relevance >= 0.5);
    }

    #[tokio::test]
    async fn test_irrelevant_task_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let memory = FileMemory::new(dir.path().join("memory.json"), 0.5);
        memory.store("open the calculator", &transcript("done")).await.unwrap();
        assert!(memory.retrieve("weather in paris").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let memory = FileMemory::new(dir.path().join("none.json"), 0.1);
        assert!(memory.retrieve("anything at all").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "not json").unwrap();
        let memory = FileMemory::new(path, 0.1);
        assert!(matches!(
            memory.retrieve("task").await,
            Err(ConductorError::Memory(_))
        ));
    }

    #[test]
    fn test_attach_appends_to_prompt() {
        let rec = Recollection {
            task: "old".into(),
            summary: "Outcome: fine".into(),
            relevance: 1.0,
        };
        let prompt = rec.attach("You are an agent.\n");
        assert!(prompt.starts_with("You are an agent.\n\n## Memory"));
        assert!(prompt.ends_with("Outcome: fine"));
    }
}
