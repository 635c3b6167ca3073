//! Snapshot parsing for agent-browser output
//!
//! `agent-browser snapshot --json` returns the accessibility tree plus a map
//! of element refs. The web agent is shown a compact listing of the elements
//! it can act on instead of the raw JSON.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Parsed snapshot from agent-browser
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<SnapshotData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotData {
    /// Accessibility tree as text
    #[serde(default)]
    pub snapshot: String,
    /// Element refs keyed by ref id
    #[serde(default)]
    pub refs: BTreeMap<String, Element>,
}

/// An element in the snapshot
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Element {
    /// ARIA role
    #[serde(default)]
    pub role: String,
    /// Accessible name
    #[serde(default)]
    pub name: String,
    /// Element value (for inputs)
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub focused: bool,
}

impl Snapshot {
    /// Parse the JSON printed by `agent-browser snapshot --json`
    pub fn parse(output: &str) -> Option<Self> {
        serde_json::from_str(output).ok()
    }

    /// Number of elements with refs
    pub fn count_elements(&self) -> usize {
        self.data.as_ref().map(|d| d.refs.len()).unwrap_or(0)
    }

    /// Get an element by ref, with or without the `@` prefix
    pub fn get_element(&self, ref_id: &str) -> Option<&Element> {
        let clean_ref = ref_id.strip_prefix('@').unwrap_or(ref_id);
        self.data.as_ref().and_then(|d| d.refs.get(clean_ref))
    }

    /// Listing of interactive elements, one per line
    pub fn render(&self) -> String {
        let Some(data) = &self.data else {
            return "No snapshot data available".to_string();
        };

        let mut interactive: Vec<_> = data
            .refs
            .iter()
            .filter(|(_, el)| el.is_interactive())
            .collect();
        interactive.sort_by_key(|(ref_id, _)| ref_order(ref_id));

        let mut output = format!("Page elements ({}):\n", data.refs.len());
        for (ref_id, element) in interactive {
            output.push_str(&format!("  @{}: {} \"{}\"", ref_id, element.role, element.name));
            if let Some(value) = &element.value {
                output.push_str(&format!(" = \"{}\"", value));
            }
            if element.focused {
                output.push_str(" [focused]");
            }
            output.push('\n');
        }

        if !data.snapshot.is_empty() {
            output.push_str("\nAccessibility tree:\n");
            output.push_str(&data.snapshot);
        }
        output
    }
}

/// Sort key for refs like `e12`: numeric part first, then the text
fn ref_order(ref_id: &str) -> (u64, &str) {
    let digits = ref_id.trim_start_matches(|c: char| !c.is_ascii_digit());
    (digits.parse().unwrap_or(u64::MAX), ref_id)
}

impl Element {
    /// Whether the agent can act on this element
    pub fn is_interactive(&self) -> bool {
        matches!(
            self.role.as_str(),
            "button"
                | "link"
                | "textbox"
                | "checkbox"
                | "radio"
                | "combobox"
                | "menuitem"
                | "tab"
                | "switch"
                | "searchbox"
                | "spinbutton"
        )
    }
}
