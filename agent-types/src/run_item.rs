//! The run-level trace (`RunItem`, `RunResult`) and run-wide configuration.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::request::Role;
use crate::response::{ModelResponse, Usage};
use crate::settings::ModelSettings;

/// One entry in a run's trace. Appended in temporal order; never mutated
/// after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunItem {
    /// A plain message (user, assistant, system, or tool-role).
    Message {
        /// The message's role.
        role: Role,
        /// The message's content.
        content: String,
    },
    /// A model-requested tool call.
    ToolCall {
        /// The tool's name.
        name: String,
        /// The raw parameters passed.
        parameters: serde_json::Value,
    },
    /// The result of a tool call. Always immediately follows the
    /// corresponding `ToolCall` item with the same `name`.
    ToolResult {
        /// The tool's name.
        name: String,
        /// The rendered result (or `Error: ...` string).
        result: String,
    },
    /// A transfer of control to another agent.
    Handoff {
        /// The agent handed off to (or `return_to_delegator`).
        agent: String,
        /// The (possibly enhanced) input carried into the new agent.
        input: String,
    },
}

/// The result of a guardrail check against the input or output of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailResult {
    /// The guardrail's name.
    pub name: String,
    /// Whether the guardrail passed.
    pub passed: bool,
    /// An optional human-readable explanation.
    pub message: Option<String>,
}

/// Run-wide configuration, contributing the higher-priority layer of the
/// settings override order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Override the agent's declared model reference for the whole run.
    pub model_override: Option<String>,
    /// A tag identifying the provider family (used to pick the tool-result
    /// wire format).
    pub provider: Option<String>,
    /// Settings that win over the agent's own for any field they set.
    pub settings: ModelSettings,
    /// Names of guardrails to run against the initial input.
    #[serde(default)]
    pub input_guardrails: Vec<String>,
    /// Names of guardrails to run against the final output.
    #[serde(default)]
    pub output_guardrails: Vec<String>,
    /// Whether tracing is enabled for this run. The engine itself never
    /// ships a tracing backend — this only gates
    /// whether `tracing` spans are created.
    #[serde(default)]
    pub tracing_enabled: bool,
    /// Free-form extra fields for forward compatibility.
    #[serde(default)]
    pub extra: Map<String, serde_json::Value>,
}

/// The accumulated result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// The original input the run started with.
    pub original_input: crate::request::RunInput,
    /// Items generated during the run, in temporal order.
    pub new_items: Vec<RunItem>,
    /// Raw model responses, one per turn.
    pub raw_responses: Vec<ModelResponse>,
    /// The final output, set at most once.
    pub final_output: Option<String>,
    /// The name of the agent that produced `final_output`, or the last
    /// agent active when the run terminated without one.
    pub last_agent: String,
    /// Accumulated guardrail results.
    #[serde(default)]
    pub guardrail_results: Vec<GuardrailResult>,
    /// Cumulative token usage across all turns.
    #[serde(default)]
    pub usage: Usage,
}

impl RunResult {
    /// Start a new, empty result for a run beginning under `agent`.
    #[must_use]
    pub fn new(original_input: crate::request::RunInput, agent: impl Into<String>) -> Self {
        Self {
            original_input,
            new_items: Vec::new(),
            raw_responses: Vec::new(),
            final_output: None,
            last_agent: agent.into(),
            guardrail_results: Vec::new(),
            usage: Usage::default(),
        }
    }

    /// Set the final output. Must only be called once; debug builds assert
    /// it.
    pub fn set_final_output(&mut self, output: Option<String>) {
        debug_assert!(
            self.final_output.is_none(),
            "final_output assigned more than once"
        );
        self.final_output = output;
    }
}
