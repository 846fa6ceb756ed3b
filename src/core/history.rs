//! Execution and rollback history logs.
//!
//! Each log is a single JSON document at the project root, loaded fully and
//! rewritten fully (via temp file + rename) on every save.

use crate::models::execution::ExecutionHistory;
use crate::models::rollback::RollbackHistory;
use crate::utils::fs::{load_json_or_default, save_json_atomic};
use crate::Result;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Execution history file name.
pub const EXECUTION_HISTORY_FILE: &str = "refactoring-history.json";

/// Rollback history file name.
pub const ROLLBACK_HISTORY_FILE: &str = "rollbacks.json";

/// A history document persisted at the project root.
pub trait HistoryLog: Serialize + DeserializeOwned + Default {
    /// File name relative to the project root.
    const FILE_NAME: &'static str;

    /// Update the `last_updated` stamp.
    fn touch(&mut self, timestamp: String);
}

impl HistoryLog for ExecutionHistory {
    const FILE_NAME: &'static str = EXECUTION_HISTORY_FILE;

    fn touch(&mut self, timestamp: String) {
        self.last_updated = timestamp;
    }
}

impl HistoryLog for RollbackHistory {
    const FILE_NAME: &'static str = ROLLBACK_HISTORY_FILE;

    fn touch(&mut self, timestamp: String) {
        self.last_updated = timestamp;
    }
}

/// Path of a history log for a project.
pub fn history_path<T: HistoryLog>(project_root: &Path) -> PathBuf {
    project_root.join(T::FILE_NAME)
}

/// Load a history log, or start empty if it does not exist.
pub async fn load_history<T: HistoryLog>(project_root: &Path) -> Result<T> {
    load_json_or_default(&history_path::<T>(project_root)).await
}

/// Rewrite a history log. Failures are fatal to the caller.
pub async fn save_history<T: HistoryLog>(log: &mut T, project_root: &Path) -> Result<()> {
    log.touch(Utc::now().to_rfc3339());
    let path = history_path::<T>(project_root);
    save_json_atomic(log, &path).await?;
    tracing::debug!("History saved to {:?}", path);
    Ok(())
}
