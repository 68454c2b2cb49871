//! The task store: a `RwLock`-guarded map of tasks plus a per-agent
//! delegator stack, shared by every agent participating in a run.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use tokio::sync::RwLock;

use crate::error::TaskError;
use crate::task::{Task, TaskStatus, describe_from_input};

/// 64-bit-random hex task id, falling back to a timestamp-nanosecond id if
/// the OS entropy source is unavailable.
fn generate_task_id() -> String {
    let mut bytes = [0u8; 8];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => format!("{:016x}", u64::from_be_bytes(bytes)),
        Err(err) => {
            tracing::warn!(error = %err, "entropy source unavailable, falling back to a timestamp id");
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            format!("{nanos:x}")
        }
    }
}

#[derive(Default)]
struct Inner {
    tasks: HashMap<String, Task>,
    /// Per-child-agent stack of delegating agents, innermost delegation on
    /// top. A stack (not a single slot) because an agent can be delegated
    /// to again before it returns from an earlier delegation.
    delegation_chains: HashMap<String, Vec<String>>,
    /// Task ids in creation order, to resolve "the current task for this
    /// agent" without scanning the whole map's iteration order.
    creation_order: Vec<String>,
}

/// In-process store of delegation tasks, guarded by a single
/// reader-writer lock shared across the whole run.
#[derive(Default)]
pub struct TaskStore {
    inner: RwLock<Inner>,
}

impl TaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `child` is now working on behalf of `parent`.
    pub async fn register_delegation(&self, parent: &str, child: &str) {
        let mut inner = self.inner.write().await;
        inner
            .delegation_chains
            .entry(child.to_string())
            .or_default()
            .push(parent.to_string());
    }

    /// The agent `agent` should return to, if it is mid-delegation.
    #[must_use]
    pub async fn get_delegator(&self, agent: &str) -> Option<String> {
        let inner = self.inner.read().await;
        inner
            .delegation_chains
            .get(agent)
            .and_then(|stack| stack.last())
            .cloned()
    }

    /// Pop the innermost delegation of `child` back to `parent`. A no-op
    /// beyond logging if `child` has no pending delegation from `parent`.
    pub async fn complete_delegation(&self, parent: &str, child: &str) {
        let mut inner = self.inner.write().await;
        if let Some(stack) = inner.delegation_chains.get_mut(child) {
            if stack.last().map(String::as_str) == Some(parent) {
                stack.pop();
            } else {
                tracing::warn!(parent, child, "completing a delegation that isn't on top of the stack");
                stack.retain(|p| p != parent);
            }
            if stack.is_empty() {
                inner.delegation_chains.remove(child);
            }
        }
    }

    /// Create a fresh, unrelated task for a `parent -> child` delegation.
    pub async fn create_task(&self, parent: &str, child: &str, input: &str) -> String {
        let id = generate_task_id();
        let task = Task::new(id.clone(), parent, child, describe_from_input(input));
        let mut inner = self.inner.write().await;
        inner.tasks.insert(id.clone(), task);
        inner.creation_order.push(id.clone());
        id
    }

    /// Create a task related to `parent_task_id`, copying its working
    /// context forward so artifacts survive the handoff.
    pub async fn create_related_task(
        &self,
        parent_task_id: &str,
        parent: &str,
        child: &str,
        input: &str,
    ) -> Result<String, TaskError> {
        let id = generate_task_id();
        let mut inner = self.inner.write().await;
        let context = inner
            .tasks
            .get(parent_task_id)
            .ok_or_else(|| TaskError::NotFound(parent_task_id.to_string()))?
            .context
            .clone();

        let mut task = Task::new(id.clone(), parent, child, describe_from_input(input));
        task.context = context;
        task.related_task_ids.push(parent_task_id.to_string());
        inner.tasks.insert(id.clone(), task);
        inner.creation_order.push(id.clone());

        if let Some(parent_task) = inner.tasks.get_mut(parent_task_id) {
            parent_task.related_task_ids.push(id.clone());
        }
        Ok(id)
    }

    /// The most recently created task for which `agent` is the child,
    /// i.e. the task `agent` is currently working.
    #[must_use]
    pub async fn get_task_for_agent(&self, agent: &str) -> Option<Task> {
        let inner = self.inner.read().await;
        inner
            .creation_order
            .iter()
            .rev()
            .filter_map(|id| inner.tasks.get(id))
            .find(|t| t.child_agent == agent)
            .cloned()
    }

    /// The task the parent of `task_id`'s agent is itself executing, used
    /// to reattach a child's result into its delegator's working context.
    #[must_use]
    pub async fn get_parent_task(&self, task_id: &str) -> Option<Task> {
        let inner = self.inner.read().await;
        let task = inner.tasks.get(task_id)?;
        let parent_agent = task.parent_agent.clone();
        inner
            .creation_order
            .iter()
            .rev()
            .filter_map(|id| inner.tasks.get(id))
            .find(|t| t.child_agent == parent_agent)
            .cloned()
    }

    /// Fetch a task by id.
    #[must_use]
    pub async fn get(&self, id: &str) -> Option<Task> {
        self.inner.read().await.tasks.get(id).cloned()
    }

    /// Overwrite a task's artifact and artifact type.
    pub async fn update_task_context(
        &self,
        id: &str,
        artifact: Option<String>,
        artifact_type: Option<String>,
    ) -> Result<(), TaskError> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.context.artifact = artifact;
        task.context.artifact_type = artifact_type;
        Ok(())
    }

    /// Merge one metadata key into a task's working context.
    pub async fn add_task_metadata(
        &self,
        id: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), TaskError> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.context.metadata.insert(key.into(), value);
        Ok(())
    }

    /// Append an interaction to a task's history.
    pub async fn add_task_interaction(
        &self,
        id: &str,
        role: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), TaskError> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.interactions.push(crate::task::Interaction {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Mark a task complete with a result. Fails if the task is already
    /// terminal.
    pub async fn complete_task(&self, id: &str, result: impl Into<String>) -> Result<(), TaskError> {
        self.finish(id, TaskStatus::Complete, Some(result.into()), None).await
    }

    /// Mark a task failed with an error message. Fails if the task is
    /// already terminal.
    pub async fn fail_task(&self, id: &str, error: impl Into<String>) -> Result<(), TaskError> {
        self.finish(id, TaskStatus::Failed, None, Some(error.into())).await
    }

    async fn finish(
        &self,
        id: &str,
        status: TaskStatus,
        result: Option<String>,
        error: Option<String>,
    ) -> Result<(), TaskError> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        if task.status != TaskStatus::Pending {
            return Err(TaskError::AlreadyTerminal(
                id.to_string(),
                if task.status == TaskStatus::Complete { "complete" } else { "failed" },
            ));
        }
        task.status = status;
        task.completed_at = Some(Utc::now());
        task.result = result;
        task.error = error;
        Ok(())
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore").finish_non_exhaustive()
    }
}
