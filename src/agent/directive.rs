//! Structured directives parsed from model replies
//!
//! The model answers in a small line-oriented grammar:
//!
//! ```text
//! Thought: I should list the directory first.
//! Route: Action
//! Action Name: shell
//! Action Input: {"command": "ls -la"}
//! ```
//!
//! A field starts on a line whose first non-blank text is a known label
//! followed by a colon, and runs until the next label line or the end of the
//! reply. Only the first occurrence of a label opens a field; a repeated
//! label, or label-like text in the middle of a line, stays part of the
//! current value. `Final Answer` runs to the end of the reply, and a
//! `Thought` keeps route-specific labels (`Agent Name`, `Request`,
//! `Action Name`, `Action Input`) as value text until a `Route` has been
//! given. Labels match case-insensitively, may use `-` or `_` for spaces,
//! and may be wrapped in `**` emphasis.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Revision of the label grammar the prompts and this parser agree on
pub const GRAMMAR_VERSION: u32 = 1;

/// Labels understood by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Thought,
    Route,
    AgentName,
    Request,
    ActionName,
    ActionInput,
    FinalAnswer,
}

impl Label {
    pub const ALL: [Label; 7] = [
        Label::Thought,
        Label::Route,
        Label::AgentName,
        Label::Request,
        Label::ActionName,
        Label::ActionInput,
        Label::FinalAnswer,
    ];

    /// Canonical spelling used in prompts
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Thought => "Thought",
            Label::Route => "Route",
            Label::AgentName => "Agent Name",
            Label::Request => "Request",
            Label::ActionName => "Action Name",
            Label::ActionInput => "Action Input",
            Label::FinalAnswer => "Final Answer",
        }
    }

    /// Labels that only make sense once a route has been chosen
    fn is_route_specific(&self) -> bool {
        matches!(
            self,
            Label::AgentName | Label::Request | Label::ActionName | Label::ActionInput
        )
    }

    fn from_normalized(name: &str) -> Option<Label> {
        Label::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a reply could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    /// The reply contained no label at all
    #[error("model reply contains no directive labels")]
    NoDirective,
    /// `Action Input` was present but not a JSON value
    #[error("Action Input is not valid JSON: {0}")]
    InvalidActionInput(String),
}

/// Fields extracted from one model reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directive {
    fields: BTreeMap<Label, String>,
}

/// If `line` opens a field, return its label and the text after the colon.
fn match_label(line: &str) -> Option<(Label, &str)> {
    let trimmed = line.trim_start();
    let colon = trimmed.find(':')?;
    let (head, rest) = trimmed.split_at(colon);

    let name = head
        .trim()
        .trim_matches('*')
        .trim()
        .replace(['-', '_'], " ");
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let label = Label::from_normalized(&name)?;

    let rest = &rest[1..];
    let rest = rest.strip_prefix("**").unwrap_or(rest);
    Some((label, rest))
}

/// Whether a label line starts a new field given the fields opened so far
fn opens_field(label: Label, order: &[(Label, Vec<&str>)]) -> bool {
    let seen = |wanted: Label| order.iter().any(|(l, _)| *l == wanted);
    match order.last() {
        _ if seen(label) => false,
        Some((Label::FinalAnswer, _)) => false,
        Some((Label::Thought, _)) if label.is_route_specific() => seen(Label::Route),
        _ => true,
    }
}

impl Directive {
    /// Parse a model reply
    ///
    /// Text before the first label is ignored. A reply without any label is
    /// [`DirectiveError::NoDirective`]; every other reply parses, with
    /// missing labels simply absent.
    pub fn parse(text: &str) -> Result<Self, DirectiveError> {
        let mut order: Vec<(Label, Vec<&str>)> = Vec::new();

        for line in text.lines() {
            match match_label(line) {
                Some((label, rest)) if opens_field(label, &order) => {
                    order.push((label, vec![rest]));
                }
                _ => {
                    if let Some((_, lines)) = order.last_mut() {
                        lines.push(line);
                    }
                }
            }
        }

        if order.is_empty() {
            return Err(DirectiveError::NoDirective);
        }

        let fields = order
            .into_iter()
            .map(|(label, lines)| (label, lines.join("\n").trim().to_string()))
            .collect();

        Ok(Self { fields })
    }

    /// Parse, treating a reply without labels as an empty directive
    pub fn parse_lenient(text: &str) -> Self {
        Self::parse(text).unwrap_or_default()
    }

    /// Build a directive from explicit fields
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (Label, &'a str)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(label, value)| (label, value.trim().to_string()))
                .collect(),
        }
    }

    /// Value of a field, if the label was present
    pub fn get(&self, label: Label) -> Option<&str> {
        self.fields.get(&label).map(String::as_str)
    }

    pub fn thought(&self) -> Option<&str> {
        self.get(Label::Thought)
    }

    pub fn route(&self) -> Option<&str> {
        self.get(Label::Route)
    }

    pub fn agent_name(&self) -> Option<&str> {
        self.get(Label::AgentName)
    }

    pub fn request(&self) -> Option<&str> {
        self.get(Label::Request)
    }

    pub fn action_name(&self) -> Option<&str> {
        self.get(Label::ActionName)
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.get(Label::FinalAnswer)
    }

    /// Whether no label was found
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decode `Action Input` as JSON
    ///
    /// A missing field is `Value::Null`. A surrounding markdown code fence is
    /// ignored.
    pub fn action_input(&self) -> Result<Value, DirectiveError> {
        let Some(raw) = self.get(Label::ActionInput) else {
            return Ok(Value::Null);
        };

        let body = strip_code_fence(raw);
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(body).map_err(|e| DirectiveError::InvalidActionInput(e.to_string()))
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as ```json
    let inner = match inner.find('\n') {
        Some(pos) if !inner[..pos].trim_start().starts_with('{') => &inner[pos + 1..],
        _ => inner,
    };
    inner.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_labels_extracted_and_trimmed() {
        let reply = "Thought:   check the disk   \n\
                     Route: Action\n\
                     Agent Name:  Terminal \n\
                     Request: df -h\n\
                     Action Name: shell\n\
                     Action Input: {\"command\": \"df -h\"}\n\
                     Final Answer:   done  ";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(directive.thought(), Some("check the disk"));
        assert_eq!(directive.route(), Some("Action"));
        assert_eq!(directive.agent_name(), Some("Terminal"));
        assert_eq!(directive.request(), Some("df -h"));
        assert_eq!(directive.action_name(), Some("shell"));
        assert_eq!(directive.action_input().unwrap(), json!({"command": "df -h"}));
        assert_eq!(directive.final_answer(), Some("done"));
    }

    #[test]
    fn test_missing_label_is_absent() {
        let directive = Directive::parse("Thought: nothing to do\nRoute: Final").unwrap();
        assert_eq!(directive.final_answer(), None);
        assert_eq!(directive.action_name(), None);
        assert_eq!(directive.action_input().unwrap(), Value::Null);
    }

    #[test]
    fn test_no_labels_is_distinct_failure() {
        assert_eq!(
            Directive::parse("I am not sure what you mean."),
            Err(DirectiveError::NoDirective)
        );
        assert_eq!(Directive::parse(""), Err(DirectiveError::NoDirective));
        assert!(Directive::parse_lenient("plain prose").is_empty());
    }

    #[test]
    fn test_multiline_values() {
        let reply = "Thought: first line\n  second line\n\nRoute: final\nFinal Answer: Files:\n- a.txt\n- b.txt\n";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(directive.thought(), Some("first line\n  second line"));
        assert_eq!(directive.final_answer(), Some("Files:\n- a.txt\n- b.txt"));
    }

    #[test]
    fn test_reordered_labels() {
        let reply = "Route: action\nAction Input: {}\nThought: easy\nAction Name: shell";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(directive.route(), Some("action"));
        assert_eq!(directive.action_input().unwrap(), json!({}));
        assert_eq!(directive.thought(), Some("easy"));
        assert_eq!(directive.action_name(), Some("shell"));
    }

    #[test]
    fn test_final_answer_keeps_quoted_labels() {
        let reply = "Route: final\nFinal Answer: The file contains:\nRequest: GET /index.html\nAction Name: none";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(
            directive.final_answer(),
            Some("The file contains:\nRequest: GET /index.html\nAction Name: none")
        );
        assert_eq!(directive.request(), None);
        assert_eq!(directive.action_name(), None);
    }

    #[test]
    fn test_thought_keeps_route_specific_labels_before_route() {
        let reply = "Thought: the server logged\nRequest: GET /health\nso it is up\nRoute: Final\nFinal Answer: up";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(
            directive.thought(),
            Some("the server logged\nRequest: GET /health\nso it is up")
        );
        assert_eq!(directive.request(), None);
        assert_eq!(directive.route(), Some("Final"));
        assert_eq!(directive.final_answer(), Some("up"));
    }

    #[test]
    fn test_label_like_text_inside_value() {
        let reply = "Thought: the log says Route: action failed\n\
                     Route: final\n\
                     Final Answer: The output was:\n\
                     Thought: this line came from the tool\n\
                     Route: ignored too";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(directive.thought(), Some("the log says Route: action failed"));
        assert_eq!(directive.route(), Some("final"));
        assert_eq!(
            directive.final_answer(),
            Some("The output was:\nThought: this line came from the tool\nRoute: ignored too")
        );
    }

    #[test]
    fn test_tolerant_label_spelling() {
        let reply = "**Thought:** bold label\n  route : ACTION\naction-name: shell\nACTION_INPUT: {}";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(directive.thought(), Some("bold label"));
        assert_eq!(directive.route(), Some("ACTION"));
        assert_eq!(directive.action_name(), Some("shell"));
        assert_eq!(directive.action_input().unwrap(), json!({}));
    }

    #[test]
    fn test_preamble_and_crlf() {
        let reply = "Sure, here you go.\r\nThought: ok\r\nRoute: final\r\nFinal Answer: yes\r\n";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(directive.thought(), Some("ok"));
        assert_eq!(directive.final_answer(), Some("yes"));
    }

    #[test]
    fn test_unknown_label_is_value_text() {
        let reply = "Thought: plan\nNote: remember this\nRoute: final";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(directive.thought(), Some("plan\nNote: remember this"));
    }

    #[test]
    fn test_fenced_action_input() {
        let reply = "Action Name: shell\nAction Input: ```json\n{\"command\": \"pwd\"}\n```";
        let directive = Directive::parse(reply).unwrap();
        assert_eq!(directive.action_input().unwrap(), json!({"command": "pwd"}));

        let inline = Directive::from_fields([(Label::ActionInput, "```{\"a\": 1}```")]);
        assert_eq!(inline.action_input().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_invalid_action_input() {
        let directive = Directive::parse("Action Name: shell\nAction Input: ls -la").unwrap();
        assert!(matches!(
            directive.action_input(),
            Err(DirectiveError::InvalidActionInput(_))
        ));
    }

    #[test]
    fn test_empty_value_is_present_but_empty() {
        let directive = Directive::parse("Thought:\nRoute: final").unwrap();
        assert_eq!(directive.thought(), Some(""));
    }
}
