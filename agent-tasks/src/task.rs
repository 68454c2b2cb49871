//! The `Task` entity and its working context.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task's lifecycle status. Monotone: `Pending -> {Complete, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Delegated, not yet returned.
    Pending,
    /// Returned successfully.
    Complete,
    /// Returned with a failure.
    Failed,
}

/// A single turn of the delegation conversation, recorded for audit/replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Who produced this interaction (`"parent"`, `"child"`, or a role name).
    pub role: String,
    /// The interaction's content.
    pub content: String,
    /// When the interaction was recorded.
    pub timestamp: DateTime<Utc>,
}

/// The agent-spanning bundle of an artifact plus metadata, propagated
/// forward across handoffs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkingContext {
    /// The artifact itself (e.g. code being edited), if any.
    pub artifact: Option<String>,
    /// A hint at what kind of artifact this is (`"code"`, `"text"`, ...).
    pub artifact_type: Option<String>,
    /// Free-form metadata accumulated across the delegation chain.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A record of one delegation: its status, result, and working context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique id (64-bit-random hex, or a timestamp-nanosecond fallback).
    pub id: String,
    /// The agent that delegated.
    pub parent_agent: String,
    /// The agent delegated to.
    pub child_agent: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal status. `Some` iff `status` is
    /// terminal.
    pub completed_at: Option<DateTime<Utc>>,
    /// The task's result, set on successful completion.
    pub result: Option<String>,
    /// The task's error, set on failure.
    pub error: Option<String>,
    /// Ids of related tasks (parent/child chain), forming an acyclic graph.
    #[serde(default)]
    pub related_task_ids: Vec<String>,
    /// A short human-readable description (first 100 characters of the
    /// triggering input, with an ellipsis if truncated).
    pub description: String,
    /// Working context carried forward across the delegation chain.
    #[serde(default)]
    pub context: WorkingContext,
    /// The interaction history for this task.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl Task {
    /// Create a new, pending task.
    pub(crate) fn new(
        id: String,
        parent_agent: impl Into<String>,
        child_agent: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            parent_agent: parent_agent.into(),
            child_agent: child_agent.into(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
            related_task_ids: Vec::new(),
            description: description.into(),
            context: WorkingContext::default(),
            interactions: Vec::new(),
        }
    }
}

/// Build a task description from free-form input: the first 100 characters,
/// with an ellipsis appended if truncation occurred.
#[must_use]
pub fn describe_from_input(input: &str) -> String {
    let truncated: String = input.chars().take(100).collect();
    if input.chars().count() > 100 {
        format!("{truncated}...")
    } else {
        truncated
    }
}
