//! Prompt templates
//!
//! Templates are plain text with `{name}` placeholders; `{{` and `}}` stand
//! for literal braces. A template is checked when the owning agent is built:
//! a malformed placeholder or one the agent does not supply is a
//! configuration error, never a runtime one.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use chrono::Local;

use crate::core::{ConductorError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(String),
}

/// A parsed prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    segments: Vec<Segment>,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PromptTemplate {
    /// Parse a template
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let rest = &text[pos + 1..];
                    let end = rest.find('}').ok_or_else(|| {
                        ConductorError::template(format!(
                            "{}: unclosed '{{' at byte {}",
                            name, pos
                        ))
                    })?;
                    let var = &rest[..end];
                    if !is_identifier(var) {
                        return Err(ConductorError::template(format!(
                            "{}: invalid placeholder '{{{}}}' (use '{{{{' for a literal brace)",
                            name, var
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Var(var.to_string()));
                    for _ in 0..=end {
                        chars.next();
                    }
                }
                '}' => {
                    return Err(ConductorError::template(format!(
                        "{}: unmatched '}}' at byte {}",
                        name, pos
                    )))
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { name, segments })
    }

    /// Parse and check placeholders against the names the caller supplies
    pub fn with_params(name: impl Into<String>, text: &str, params: &[&str]) -> Result<Self> {
        let template = Self::parse(name, text)?;
        template.require(params)?;
        Ok(template)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Placeholder names used by this template
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Var(v) => Some(v.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Fail if the template uses a placeholder outside `params`
    pub fn require(&self, params: &[&str]) -> Result<()> {
        let unknown: Vec<&str> = self
            .placeholders()
            .into_iter()
            .filter(|p| !params.contains(p))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ConductorError::template(format!(
                "{}: unknown placeholder(s) {}; available: {}",
                self.name,
                unknown.join(", "),
                params.join(", ")
            )))
        }
    }

    /// Substitute placeholders
    ///
    /// Templates are validated up front, so a missing value only happens on a
    /// programming error; it renders as an empty string and is logged.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let lookup: HashMap<&str, &str> = values.iter().copied().collect();
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Var(var) => match lookup.get(var.as_str()) {
                    Some(value) => out.push_str(value),
                    None => {
                        tracing::warn!(template = %self.name, placeholder = %var, "no value for placeholder");
                    }
                },
            }
        }

        out
    }
}

/// Load `<dir>/<agent>/<file>.md` if present, otherwise the built-in text
pub fn load_template(
    dir: Option<&Path>,
    agent: &str,
    file: &str,
    builtin: &str,
    params: &[&str],
) -> Result<PromptTemplate> {
    let name = format!("{}/{}", agent, file);

    if let Some(dir) = dir {
        let path = dir.join(agent).join(format!("{}.md", file));
        if path.exists() {
            let text = fs::read_to_string(&path)
                .map_err(|e| ConductorError::with_context(format!("reading {}", path.display()), e))?;
            tracing::debug!(template = %name, path = %path.display(), "using prompt override");
            return PromptTemplate::with_params(name, &text, params);
        }
    }

    PromptTemplate::with_params(name, builtin, params)
}

/// Facts about the machine injected into system prompts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    pub user: String,
    pub os: String,
    pub pc_name: String,
    pub home_dir: String,
    pub datetime: String,
}

impl RuntimeContext {
    /// Collect the context for the current process
    pub fn detect() -> Self {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "user".to_string());

        let pc_name = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .ok()
            .or_else(|| {
                fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|s| s.trim().to_string())
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "localhost".to_string());

        let home_dir = dirs::home_dir()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|| ".".to_string());

        Self {
            user,
            os: format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH),
            pc_name,
            home_dir,
            datetime: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
