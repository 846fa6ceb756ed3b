//! Rollback data model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One undo attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackRecord {
    /// Rollback ID.
    pub rollback_id: String,
    /// Execution being undone.
    pub execution_id: String,
    /// Rollback status.
    pub status: RollbackStatus,
    /// Files that were left untouched because they changed since the execution.
    #[serde(default)]
    pub conflicts_detected: Vec<RollbackConflict>,
    /// Files restored (or removed, for files the execution created).
    #[serde(default)]
    pub files_restored: Vec<String>,
    /// Whether conflicting files were preserved.
    pub preserve_manual_edits: bool,
    /// Start timestamp.
    pub created_at: String,
    /// Completion timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A file that changed since the execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackConflict {
    /// File path, relative to the project root.
    pub file: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Rollback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackStatus {
    Pending,
    Completed,
    Failed,
}

/// Preview of what a rollback would do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollbackImpact {
    pub execution_id: String,
    pub snapshot_id: Option<String>,
    /// Whether a snapshot batch exists for the execution.
    pub can_rollback: bool,
    /// Files that would be restored from the snapshot batch.
    pub files_to_restore: Vec<String>,
    /// Files created by the execution that would be removed.
    pub files_to_remove: Vec<String>,
    /// Files that would be skipped.
    pub conflicts: Vec<RollbackConflict>,
}

/// Rollback history file (`rollbacks.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackHistory {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub rollbacks: BTreeMap<String, RollbackRecord>,
}
