//! The per-turn request sent to a `Model`.

use serde::{Deserialize, Serialize};

use crate::settings::ModelSettings;
use crate::tool::ToolDefinition;

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A human user (or, in the standard tool-result wire format, the
    /// synthetic role tool results are attached under).
    User,
    /// The model itself.
    Assistant,
    /// A system-level instruction.
    System,
    /// A tool result, in providers (detected as Anthropic) that use a
    /// dedicated `tool` role instead of folding results into a user turn.
    Tool,
}

/// The input fed to the model for a turn: either the original free-text
/// input, or the accumulated wire-level item list built up over turns.
///
/// `Items` holds raw JSON because the exact shape of an item (a plain
/// message vs. an assistant turn carrying a verbatim `tool_calls` array vs.
/// a tool result in the standard or Anthropic-flavored wire form) varies by
/// what produced it; the assembler and turn loop are the only code that
/// needs to know those shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunInput {
    /// Plain text input, as supplied by the caller at the start of a run.
    Text(String),
    /// An ordered list of wire-level items accumulated across turns.
    Items(Vec<serde_json::Value>),
}

impl RunInput {
    /// Render this input as an item list, converting a bare `Text` input
    /// into a single user-role message item.
    #[must_use]
    pub fn into_items(self) -> Vec<serde_json::Value> {
        match self {
            RunInput::Text(text) => vec![serde_json::json!({
                "role": "user",
                "content": text,
            })],
            RunInput::Items(items) => items,
        }
    }

    /// Append a wire-level item, converting a bare `Text` input into an
    /// item list first.
    pub fn push_item(&mut self, item: serde_json::Value) {
        match self {
            RunInput::Text(text) => {
                let mut items = vec![serde_json::json!({ "role": "user", "content": text })];
                items.push(item);
                *self = RunInput::Items(items);
            }
            RunInput::Items(items) => items.push(item),
        }
    }

    /// A human-readable rendering, used for task descriptions and artifact
    /// heuristics that operate on the input as text regardless of shape.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            RunInput::Text(text) => text.clone(),
            RunInput::Items(items) => items
                .iter()
                .filter_map(|item| item.get("content").and_then(|c| c.as_str()))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for RunInput {
    fn from(value: &str) -> Self {
        RunInput::Text(value.to_string())
    }
}

impl From<String> for RunInput {
    fn from(value: String) -> Self {
        RunInput::Text(value)
    }
}

/// A single model request, assembled fresh each turn and discarded after
/// the response comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The current agent's system instructions, if any.
    pub system_instructions: Option<String>,
    /// The input for this turn.
    pub input: RunInput,
    /// Tool and handoff function descriptors. Handoff descriptors are named
    /// `handoff_to_<AgentName>`; the two namespaces never collide because
    /// agent names and tool names are validated against each other at
    /// assembly time.
    pub tools: Vec<ToolDefinition>,
    /// JSON-Schema for structured output, if the current agent declares one.
    pub output_schema: Option<serde_json::Value>,
    /// Settings merged across run-wide and per-agent layers, most specific
    /// wins.
    pub settings: ModelSettings,
}
