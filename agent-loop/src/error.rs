//! Errors the turn loop can return. Tool-dispatch failures are deliberately
//! absent here — they are never fatal, only ever serialized into an
//! [`agent_types::ToolOutput`].

use agent_types::{HookError, ProviderError};
use thiserror::Error;

/// A run-terminating failure.
#[derive(Debug, Error)]
pub enum LoopError {
    /// A handoff named an agent that isn't registered and isn't the
    /// `return_to_delegator` sentinel.
    #[error("handoff agent not found: {0}")]
    HandoffAgentNotFound(String),
    /// A `return_to_delegator` handoff was requested but the current agent
    /// has no pending delegation to return from.
    #[error("agent {0} has no delegator to return to")]
    NoDelegator(String),
    /// The model call itself failed.
    #[error("model call error: {0}")]
    ModelCall(#[from] ProviderError),
    /// A lifecycle hook returned an error.
    #[error(transparent)]
    Hook(#[from] HookError),
    /// The run was cancelled via the ambient `ToolContext` cancellation
    /// token.
    #[error("run cancelled")]
    Cancelled,
}
