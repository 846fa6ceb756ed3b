//! Rollback manager.
//!
//! Undoes a past execution by restoring every file in its pre-refactoring
//! snapshot batch:
//! - files edited since the execution are conflicts (backed up, left as-is)
//! - unchanged files are restored from their batch snapshot
//! - files the execution created are removed when unchanged
//! - directories the execution created are removed when empty

use crate::core::bank::MemoryBank;
use crate::core::executor::snapshot_id_for;
use crate::core::history::{load_history, save_history};
use crate::models::execution::{ExecutionHistory, RefactoringExecution};
use crate::models::rollback::{
    RollbackConflict, RollbackHistory, RollbackImpact, RollbackRecord, RollbackStatus,
};
use crate::models::version::{ChangeType, VersionMetadata, PRE_ROLLBACK_MARKER};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;

const ROLLBACK_PREFIX: &str = "rollback-";

/// How a file in the batch relates to what the execution left behind.
#[derive(Debug, Clone, PartialEq)]
enum FileState {
    /// Matches the last tracked write, or was removed by a tracked operation.
    Clean,
    /// Changed outside the memory bank since the execution.
    Conflict(String),
}

/// A file to restore from its batch snapshot.
#[derive(Debug, Clone)]
struct RestoreEntry {
    file: String,
    version: VersionMetadata,
    state: FileState,
}

/// A file or directory the execution created.
#[derive(Debug, Clone)]
struct CreatedEntry {
    path: String,
    is_dir: bool,
    state: FileState,
}

/// Everything a rollback would touch.
#[derive(Debug, Default)]
struct RollbackPlan {
    snapshot_id: Option<String>,
    restore: Vec<RestoreEntry>,
    created: Vec<CreatedEntry>,
}

/// Restores executions from their snapshot batches and owns the rollback history.
pub struct RollbackManager {
    bank: Arc<MemoryBank>,
    history: RollbackHistory,
}

impl RollbackManager {
    /// Create a rollback manager, loading the rollback history.
    pub async fn open(bank: Arc<MemoryBank>) -> Result<Self> {
        let history = load_history(bank.root()).await?;
        Ok(Self { bank, history })
    }

    /// Roll back an execution.
    ///
    /// With `preserve_manual_changes`, files edited since the execution are
    /// backed up and skipped. Without it they are backed up and overwritten.
    /// Per-file failures leave that file out of `files_restored`.
    pub async fn rollback_refactoring(
        &mut self,
        execution_id: &str,
        preserve_manual_changes: bool,
    ) -> Result<RollbackRecord> {
        let mut record = RollbackRecord {
            rollback_id: self.new_rollback_id(),
            execution_id: execution_id.to_string(),
            status: RollbackStatus::Pending,
            conflicts_detected: Vec::new(),
            files_restored: Vec::new(),
            preserve_manual_edits: preserve_manual_changes,
            created_at: Utc::now().to_rfc3339(),
            completed_at: None,
            error: None,
        };
        tracing::info!("Rollback {} of execution {}", record.rollback_id, execution_id);

        let plan = match self.plan(execution_id).await {
            Ok(plan) => plan,
            Err(reason) => {
                tracing::warn!("Rollback {} failed: {}", record.rollback_id, reason);
                record.error = Some(reason);
                return self.finish(record, RollbackStatus::Failed).await;
            }
        };

        for entry in &plan.restore {
            if let FileState::Conflict(reason) = &entry.state {
                self.backup_current(&entry.file).await;
                if preserve_manual_changes {
                    tracing::warn!("Skipping {}: {}", entry.file, reason);
                    record.conflicts_detected.push(RollbackConflict {
                        file: entry.file.clone(),
                        reason: reason.clone(),
                    });
                    continue;
                }
            }

            match self.bank.restore_version(&entry.file, &entry.version).await {
                Ok(_) => {
                    tracing::debug!("Restored {} to version {}", entry.file, entry.version.version);
                    record.files_restored.push(entry.file.clone());
                }
                Err(e) => tracing::warn!("Failed to restore {}: {}", entry.file, e),
            }
        }

        let mut directories: Vec<&CreatedEntry> = Vec::new();
        for entry in &plan.created {
            if entry.is_dir {
                directories.push(entry);
                continue;
            }
            if let FileState::Conflict(reason) = &entry.state {
                self.backup_current(&entry.path).await;
                if preserve_manual_changes {
                    tracing::warn!("Keeping {}: {}", entry.path, reason);
                    record.conflicts_detected.push(RollbackConflict {
                        file: entry.path.clone(),
                        reason: reason.clone(),
                    });
                    continue;
                }
            }

            match self.bank.remove_document(&entry.path).await {
                Ok(()) => {
                    tracing::debug!("Removed created file {}", entry.path);
                    record.files_restored.push(entry.path.clone());
                }
                Err(e) => tracing::warn!("Failed to remove {}: {}", entry.path, e),
            }
        }

        // Deepest first so nested created directories empty out their parents.
        directories.sort_by_key(|d| std::cmp::Reverse(d.path.matches('/').count()));
        for dir in directories {
            match self.bank.files().remove_dir_if_empty(&dir.path).await {
                Ok(true) => tracing::debug!("Removed created directory {}", dir.path),
                Ok(false) => tracing::debug!("Keeping non-empty directory {}", dir.path),
                Err(e) => tracing::warn!("Failed to remove directory {}: {}", dir.path, e),
            }
        }

        tracing::info!(
            "Rollback {}: {} restored, {} conflict(s)",
            record.rollback_id,
            record.files_restored.len(),
            record.conflicts_detected.len()
        );
        self.finish(record, RollbackStatus::Completed).await
    }

    /// Preview a rollback without touching any file.
    pub async fn analyze_rollback_impact(&self, execution_id: &str) -> Result<RollbackImpact> {
        let mut impact = RollbackImpact {
            execution_id: execution_id.to_string(),
            ..RollbackImpact::default()
        };

        let plan = match self.plan(execution_id).await {
            Ok(plan) => plan,
            Err(reason) => {
                tracing::debug!("Nothing to roll back for {}: {}", execution_id, reason);
                impact.snapshot_id = self
                    .load_execution(execution_id)
                    .await?
                    .and_then(|e| e.snapshot_id);
                return Ok(impact);
            }
        };

        impact.snapshot_id = plan.snapshot_id;
        impact.can_rollback = true;
        for entry in plan.restore {
            match entry.state {
                FileState::Clean => impact.files_to_restore.push(entry.file),
                FileState::Conflict(reason) => impact.conflicts.push(RollbackConflict {
                    file: entry.file,
                    reason,
                }),
            }
        }
        for entry in plan.created {
            match entry.state {
                FileState::Clean => impact.files_to_remove.push(entry.path),
                FileState::Conflict(reason) => impact.conflicts.push(RollbackConflict {
                    file: entry.path,
                    reason,
                }),
            }
        }
        Ok(impact)
    }

    /// Look up a rollback.
    pub fn get_rollback(&self, rollback_id: &str) -> Option<&RollbackRecord> {
        self.history.rollbacks.get(rollback_id)
    }

    /// Rollbacks, newest first.
    pub fn list_rollbacks(&self) -> Vec<&RollbackRecord> {
        let mut rollbacks: Vec<_> = self.history.rollbacks.values().collect();
        rollbacks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rollbacks
    }

    /// Whether an execution has a completed rollback.
    pub fn was_rolled_back(&self, execution_id: &str) -> bool {
        self.history
            .rollbacks
            .values()
            .any(|r| r.execution_id == execution_id && r.status == RollbackStatus::Completed)
    }

    /// Work out what a rollback would do. `Err` carries the reason the
    /// execution cannot be rolled back.
    async fn plan(&self, execution_id: &str) -> std::result::Result<RollbackPlan, String> {
        let execution = self
            .load_execution(execution_id)
            .await
            .map_err(|e| format!("Failed to read execution history: {}", e))?;

        let snapshot_id = match &execution {
            Some(execution) => match &execution.snapshot_id {
                Some(id) => id.clone(),
                None => {
                    return Err(format!(
                        "Execution {} has no snapshot (dry run or not executed)",
                        execution_id
                    ))
                }
            },
            None => snapshot_id_for(execution_id),
        };

        let mut plan = RollbackPlan {
            snapshot_id: Some(snapshot_id.clone()),
            ..RollbackPlan::default()
        };

        for file in self.bank.tracked_files().await {
            let Some(meta) = self.bank.file_metadata(&file).await else {
                continue;
            };
            let Some(version) = meta.batch_version(&snapshot_id).cloned() else {
                continue;
            };
            let state = self.file_state(&file).await;
            plan.restore.push(RestoreEntry {
                file,
                version,
                state,
            });
        }

        // Without a record there is nothing else to go on.
        let Some(execution) = execution else {
            if plan.restore.is_empty() {
                return Err(format!("No snapshot found for {}", snapshot_id));
            }
            return Ok(plan);
        };

        // Every affected file needs its batch version before anything is removed.
        let missing: Vec<&String> = execution
            .affected_files
            .iter()
            .filter(|file| !plan.restore.iter().any(|r| &r.file == *file))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "Snapshot {} is missing versions for: {}",
                snapshot_id,
                missing
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        let created = execution.created_files;
        for path in created {
            if plan.restore.iter().any(|r| r.file == path) {
                continue;
            }
            let files = self.bank.files();
            if !files.exists(&path).await {
                continue;
            }
            if files.is_dir(&path).await {
                plan.created.push(CreatedEntry {
                    path,
                    is_dir: true,
                    state: FileState::Clean,
                });
            } else {
                let state = self.file_state(&path).await;
                plan.created.push(CreatedEntry {
                    path,
                    is_dir: false,
                    state,
                });
            }
        }

        Ok(plan)
    }

    /// Compare a file on disk with what the memory bank last recorded.
    async fn file_state(&self, file: &str) -> FileState {
        let Some(meta) = self.bank.file_metadata(file).await else {
            return FileState::Conflict("File is not tracked".to_string());
        };
        let current = match self.bank.files().current_hash(file).await {
            Ok(current) => current,
            Err(e) => return FileState::Conflict(format!("Failed to read file: {}", e)),
        };

        match (current, meta.deleted_at.is_some()) {
            (None, true) => FileState::Clean,
            (None, false) => FileState::Conflict("File was deleted since execution".to_string()),
            (Some(_), true) => FileState::Conflict("File was recreated since execution".to_string()),
            (Some(hash), false) if hash != meta.content_hash => {
                FileState::Conflict("File was modified since execution".to_string())
            }
            (Some(_), false) => FileState::Clean,
        }
    }

    /// Save the current content of a file as a manual backup. Missing files
    /// have nothing to back up.
    async fn backup_current(&self, file: &str) {
        if !self.bank.files().exists(file).await {
            return;
        }
        let description = format!("{}{}", PRE_ROLLBACK_MARKER, Utc::now().to_rfc3339());
        match self
            .bank
            .snapshot_file(file, ChangeType::ManualBackup, Some(description), None)
            .await
        {
            Ok(version) => tracing::info!("Backed up {} as version {}", file, version.version),
            Err(e) => tracing::warn!("Failed to back up {}: {}", file, e),
        }
    }

    async fn load_execution(&self, execution_id: &str) -> Result<Option<RefactoringExecution>> {
        let mut executions: ExecutionHistory = load_history(self.bank.root()).await?;
        Ok(executions.executions.remove(execution_id))
    }

    async fn finish(
        &mut self,
        mut record: RollbackRecord,
        status: RollbackStatus,
    ) -> Result<RollbackRecord> {
        record.status = status;
        record.completed_at = Some(Utc::now().to_rfc3339());
        self.history
            .rollbacks
            .insert(record.rollback_id.clone(), record.clone());
        save_history(&mut self.history, self.bank.root()).await?;
        Ok(record)
    }

    fn new_rollback_id(&self) -> String {
        let stamp = Utc::now().format("%Y%m%d%H%M%S%6f").to_string();
        let mut id = format!("{}{}", ROLLBACK_PREFIX, stamp);
        let mut n = 1;
        while self.history.rollbacks.contains_key(&id) {
            id = format!("{}{}-{}", ROLLBACK_PREFIX, stamp, n);
            n += 1;
        }
        id
    }
}
