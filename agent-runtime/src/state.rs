//! Workflow state checkpointing.
//!
//! An async trait with `save`/`load`/`list`/`delete`-shaped operations, an
//! in-memory `RwLock`-guarded map for tests, and a one-file-per-id JSON
//! store for persistence across process restarts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tokio::sync::RwLock;

use crate::error::StateError;

/// A workflow's checkpointed progress.
///
/// Callers should treat `save_state` as "at least once per configured
/// checkpoint interval while the run is active" rather than on every single
/// state mutation — the store itself has no opinion on cadence, it only
/// persists whatever is handed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// The workflow this checkpoint belongs to.
    pub workflow_id: String,
    /// The phase currently in progress.
    pub current_phase: String,
    /// Phases that have already completed, in order. Append-only.
    pub completed_phases: Vec<String>,
    /// Artifacts accumulated so far.
    #[serde(default)]
    pub artifacts: Map<String, serde_json::Value>,
    /// When this checkpoint was written.
    pub last_checkpoint: DateTime<Utc>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Map<String, serde_json::Value>,
}

impl WorkflowState {
    /// Start a new, empty checkpoint for `workflow_id` in `phase`.
    #[must_use]
    pub fn new(workflow_id: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            current_phase: phase.into(),
            completed_phases: Vec::new(),
            artifacts: Map::new(),
            last_checkpoint: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// Mark the current phase complete and advance to `next_phase`.
    pub fn advance(&mut self, next_phase: impl Into<String>) {
        self.completed_phases.push(std::mem::replace(&mut self.current_phase, next_phase.into()));
        self.last_checkpoint = Utc::now();
    }
}

/// Persists and loads workflow checkpoints.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Save a checkpoint (create or overwrite).
    async fn save_state(&self, workflow_id: &str, state: &WorkflowState) -> Result<(), StateError>;

    /// Load the checkpoint for a workflow.
    async fn load_state(&self, workflow_id: &str) -> Result<WorkflowState, StateError>;

    /// List every workflow id with a checkpoint.
    async fn list_checkpoints(&self) -> Result<Vec<String>, StateError>;

    /// Delete a workflow's checkpoint.
    async fn delete_checkpoint(&self, workflow_id: &str) -> Result<(), StateError>;
}

/// In-memory checkpoint store, suitable for tests and single-process runs
/// that don't need to survive a restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    checkpoints: Arc<RwLock<HashMap<String, WorkflowState>>>,
}

impl InMemoryStateStore {
    /// Create a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStateStore {
    async fn save_state(&self, workflow_id: &str, state: &WorkflowState) -> Result<(), StateError> {
        self.checkpoints.write().await.insert(workflow_id.to_string(), state.clone());
        Ok(())
    }

    async fn load_state(&self, workflow_id: &str) -> Result<WorkflowState, StateError> {
        self.checkpoints
            .read()
            .await
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| StateError::NotFound(workflow_id.to_string()))
    }

    async fn list_checkpoints(&self) -> Result<Vec<String>, StateError> {
        Ok(self.checkpoints.read().await.keys().cloned().collect())
    }

    async fn delete_checkpoint(&self, workflow_id: &str) -> Result<(), StateError> {
        self.checkpoints
            .write()
            .await
            .remove(workflow_id)
            .map(|_| ())
            .ok_or_else(|| StateError::NotFound(workflow_id.to_string()))
    }
}

/// File-based checkpoint store: one JSON file per workflow, at
/// `{directory}/{workflow_id}.json`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    directory: PathBuf,
}

impl FileStateStore {
    /// Create a store rooted at `directory`. The directory is created lazily
    /// on first save.
    #[must_use]
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn path_for(&self, workflow_id: &str) -> PathBuf {
        self.directory.join(format!("{workflow_id}.json"))
    }
}

#[async_trait::async_trait]
impl StateStore for FileStateStore {
    async fn save_state(&self, workflow_id: &str, state: &WorkflowState) -> Result<(), StateError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let json = serde_json::to_string_pretty(state).map_err(|e| StateError::Serialization(e.to_string()))?;
        tokio::fs::write(self.path_for(workflow_id), json).await?;
        Ok(())
    }

    async fn load_state(&self, workflow_id: &str) -> Result<WorkflowState, StateError> {
        let path = self.path_for(workflow_id);
        let data = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StateError::NotFound(workflow_id.to_string())
            } else {
                StateError::Io(e)
            }
        })?;
        serde_json::from_str(&data).map_err(|e| StateError::Serialization(e.to_string()))
    }

    async fn list_checkpoints(&self) -> Result<Vec<String>, StateError> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(StateError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        Ok(ids)
    }

    async fn delete_checkpoint(&self, workflow_id: &str) -> Result<(), StateError> {
        let path = self.path_for(workflow_id);
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StateError::NotFound(workflow_id.to_string())
            } else {
                StateError::Io(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryStateStore::new();
        let state = WorkflowState::new("wf-1", "collect");
        store.save_state("wf-1", &state).await.unwrap();

        let loaded = store.load_state("wf-1").await.unwrap();
        assert_eq!(loaded.current_phase, "collect");
        assert_eq!(store.list_checkpoints().await.unwrap(), vec!["wf-1".to_string()]);

        store.delete_checkpoint("wf-1").await.unwrap();
        assert!(store.load_state("wf-1").await.is_err());
    }

    #[tokio::test]
    async fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().to_path_buf());
        let mut state = WorkflowState::new("wf-2", "collect");
        state.advance("summarize");
        store.save_state("wf-2", &state).await.unwrap();

        let loaded = store.load_state("wf-2").await.unwrap();
        assert_eq!(loaded.current_phase, "summarize");
        assert_eq!(loaded.completed_phases, vec!["collect".to_string()]);
    }
}
