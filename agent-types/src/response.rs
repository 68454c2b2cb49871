//! The per-turn response from a `Model`, and the `Model` trait itself.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, StreamError};
use crate::request::ModelRequest;

/// A model-initiated function invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// The tool's name.
    pub name: String,
    /// The model-supplied call id, used to correlate the result on the next
    /// turn. `None` means the engine must synthesize one.
    pub id: Option<String>,
    /// The raw parameter map, coerced by the invoker before execution.
    pub parameters: serde_json::Value,
}

/// The kind of handoff call a response carried, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffKind {
    /// A forward delegation to a named peer agent.
    Delegate,
    /// A return to the delegator (`return_to_delegator`).
    Return,
}

/// A model-requested transfer of control to another agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffCall {
    /// Target agent name, or the `return_to_delegator` sentinel.
    pub agent: String,
    /// Raw handoff parameters (`input`, and in task-tracking mode
    /// `task_id`/`return_to_agent`/`is_task_complete`).
    pub parameters: serde_json::Value,
    /// Task id this handoff is operating on, if task-tracking is enabled.
    pub task_id: Option<String>,
    /// The agent to return control to, if supplied explicitly.
    pub return_to_agent: Option<String>,
    /// Whether this return handoff completes the underlying task.
    pub is_task_complete: bool,
    /// Whether this is a forward delegation or a return.
    pub kind: HandoffKind,
}

impl HandoffCall {
    /// The sentinel target name for returning control to the delegator.
    pub const RETURN_TO_DELEGATOR: &'static str = "return_to_delegator";

    /// Extract the `input` field from `parameters`, defaulting to empty.
    #[must_use]
    pub fn input(&self) -> serde_json::Value {
        self.parameters
            .get("input")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::String(String::new()))
    }
}

/// Token accounting for a single model call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the input.
    pub input_tokens: Option<u64>,
    /// Tokens generated as output.
    pub output_tokens: Option<u64>,
    /// `input_tokens + output_tokens` when both are known.
    pub total_tokens: Option<u64>,
}

impl Usage {
    /// Accumulate another turn's usage into this running total.
    pub fn accumulate(&mut self, other: &Usage) {
        self.input_tokens = Some(self.input_tokens.unwrap_or(0) + other.input_tokens.unwrap_or(0));
        self.output_tokens =
            Some(self.output_tokens.unwrap_or(0) + other.output_tokens.unwrap_or(0));
        self.total_tokens = Some(self.total_tokens.unwrap_or(0) + other.total_tokens.unwrap_or(0));
    }
}

/// A model's response for one turn.
///
/// At most one of {final content, tool calls, handoff call} is acted upon,
/// in priority order: structured-output > handoff > tool calls > content.
/// All three may technically be present on the wire (a permissive provider
/// mapping); the turn loop is what enforces the priority, not this type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Plain text content, if any.
    pub content: Option<String>,
    /// Tool calls requested this turn.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// A handoff call, if the model requested one.
    pub handoff: Option<HandoffCall>,
    /// Usage for this turn alone (not accumulated).
    pub usage: Option<Usage>,
}

/// Events forwarded on the streaming pipeline's channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A chunk of text content.
    Content(String),
    /// A tool call, once fully assembled.
    ToolCall(ToolCall),
    /// A handoff call, once fully assembled.
    Handoff(HandoffCall),
    /// Usage information became available.
    Usage(Usage),
    /// The underlying model stream completed normally.
    Done,
    /// The underlying model stream failed.
    Error(StreamError),
}

/// The LLM provider boundary the engine consumes.
///
/// Uses RPITIT (return-position `impl Trait` in traits) rather than
/// `async_trait`, since the engine always calls through a concrete,
/// statically-known `M: Model` rather than a trait object — callers who do
/// need dynamic dispatch across providers can box a small enum or an
/// `async_trait`-wrapped adapter on their side.
pub trait Model: Send + Sync {
    /// Send a request and get a full response.
    fn get_response(
        &self,
        request: ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, ProviderError>> + Send;

    /// Send a request and get a stream of partial events terminated by
    /// `StreamEvent::Done` or `StreamEvent::Error`.
    fn stream_response(
        &self,
        request: ModelRequest,
    ) -> impl Future<Output = Result<tokio::sync::mpsc::Receiver<StreamEvent>, ProviderError>> + Send;
}
