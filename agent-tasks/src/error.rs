//! Errors returned by [`crate::TaskStore`] operations.

use thiserror::Error;

/// Failure modes for task-store operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task exists with the given id.
    #[error("no task with id {0}")]
    NotFound(String),
    /// `agent` has no pending delegator to return to.
    #[error("agent {0} has no pending delegation to return from")]
    NoDelegator(String),
    /// The task was already in a terminal state.
    #[error("task {0} is already {1}")]
    AlreadyTerminal(String, &'static str),
}
