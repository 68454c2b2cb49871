//! Error types owned by the core data model.
//!
//! Crates further up the stack (`agent-tasks`, `agent-loop`,
//! `agent-runtime`) define their own `thiserror` enums and wrap these where
//! they cross a boundary — see each crate's `error` module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tool-dispatch failures.
///
/// Tool-dispatch errors are **not fatal**: the invoker serializes them into
/// a `ToolOutput` with an `Error: ` prefix rather than aborting the run.
/// This type exists so call sites can still distinguish failure modes for
/// logging before that serialization happens.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under the requested name.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// The model-supplied parameters could not be coerced into the tool's
    /// argument type.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    /// The executor itself returned an error (already rendered to text).
    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),
}

/// Failures calling out to a `Model` implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request was rejected as malformed before it reached the network.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The provider returned an error response.
    #[error("provider error: {0}")]
    Provider(String),
    /// Any other failure, boxed so provider crates can wrap their own error
    /// types without this crate knowing about them.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failures surfaced on a streaming channel.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub struct StreamError {
    /// Human-readable description.
    pub message: String,
    /// Whether a caller-side retry of the whole stream might succeed.
    pub retryable: bool,
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StreamError {
    /// Construct a non-retryable stream error.
    #[must_use]
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    /// Construct a retryable stream error.
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }
}

/// A lifecycle hook returned an error. Any hook error aborts the run,
/// wrapped with the hook point's name.
#[derive(Debug, Error)]
#[error("hook {point} failed: {message}")]
pub struct HookError {
    /// Which hook point failed, e.g. `"on_before_tool_call"`.
    pub point: &'static str,
    /// The hook's own error message.
    pub message: String,
}

impl HookError {
    /// Construct a hook error at a named point.
    #[must_use]
    pub fn new(point: &'static str, message: impl Into<String>) -> Self {
        Self {
            point,
            message: message.into(),
        }
    }
}
