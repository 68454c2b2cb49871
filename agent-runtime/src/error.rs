//! Errors owned by the runtime layer.

use thiserror::Error;

/// Failures from the `StateStore` interface.
#[derive(Debug, Error)]
pub enum StateError {
    /// No checkpoint exists under the given workflow id.
    #[error("no checkpoint for workflow {0}")]
    NotFound(String),
    /// Serializing or deserializing the checkpoint failed.
    #[error("checkpoint serialization failed: {0}")]
    Serialization(String),
    /// Underlying filesystem error (`FileStateStore` only).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures spawning a named sub-agent.
#[derive(Debug, Error)]
pub enum SubAgentError {
    /// No sub-agent is registered under the given name.
    #[error("sub-agent not found: {0}")]
    NotFound(String),
    /// The current nesting depth has reached the sub-agent's configured max.
    #[error("max sub-agent nesting depth ({0}) exceeded")]
    MaxDepthExceeded(usize),
    /// The sub-agent's own run failed.
    #[error(transparent)]
    Run(#[from] agent_loop::LoopError),
}

/// A run aborted by the workflow recovery wrapper after a panic, when no
/// `on_panic` handler is configured.
#[derive(Debug, Error)]
#[error("workflow run panicked: {0}")]
pub struct PanicError(pub String);

/// The top-level error surfaced from [`crate::runner::Runner::run`],
/// wrapping every failure the turn loop and its surrounding runtime can
/// produce.
#[derive(Debug, Error)]
pub enum RunError {
    /// The turn loop itself failed (model call, handoff resolution, hook,
    /// or turn exhaustion).
    #[error(transparent)]
    Run(#[from] agent_loop::LoopError),
    /// The run was cancelled via its `CancellationToken` before completing.
    #[error("run cancelled")]
    Cancelled,
}
