//! Refactoring executor.
//!
//! Drives one suggestion through
//! `pending -> validating -> executing -> completed | failed`:
//! - extract operations
//! - validate (optional)
//! - snapshot every affected file under a new batch id
//! - apply operations in order, stopping at the first failure
//! - measure impact and persist the execution record

use crate::core::bank::MemoryBank;
use crate::core::extractor::extract_operations;
use crate::core::history::{load_history, save_history};
use crate::core::operations::{AppliedChange, OperationExecutor};
use crate::core::validator::ExecutionValidator;
use crate::models::execution::{ActualImpact, ExecutionHistory, ExecutionStatus, RefactoringExecution};
use crate::models::operation::{OperationParameters, OperationStatus};
use crate::models::suggestion::RefactoringSuggestion;
use crate::models::version::{ChangeType, PRE_REFACTORING_MARKER};
use crate::services::tokens::estimate_tokens;
use crate::utils::fs::{list_files_under, normalize_relative};
use crate::Result;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

const EXECUTION_PREFIX: &str = "exec-";
const SNAPSHOT_PREFIX: &str = "snapshot-";

/// Execution options.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    /// Validate and report without touching files.
    pub dry_run: bool,
    /// Run the validator before executing. Dry runs always validate.
    pub validate_first: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            validate_first: true,
        }
    }
}

/// Snapshot batch id for an execution id (`exec-<ts>` -> `snapshot-<ts>`).
pub fn snapshot_id_for(execution_id: &str) -> String {
    let stamp = execution_id
        .strip_prefix(EXECUTION_PREFIX)
        .unwrap_or(execution_id);
    format!("{}{}", SNAPSHOT_PREFIX, stamp)
}

/// Orchestrates refactoring executions and owns the execution history.
pub struct RefactoringExecutor {
    bank: Arc<MemoryBank>,
    validator: ExecutionValidator,
    operations: OperationExecutor,
    history: ExecutionHistory,
}

impl RefactoringExecutor {
    /// Create an executor, loading the execution history.
    pub async fn open(bank: Arc<MemoryBank>) -> Result<Self> {
        let history = load_history(bank.root()).await?;
        Ok(Self {
            validator: ExecutionValidator::new(bank.clone()),
            operations: OperationExecutor::new(bank.clone()),
            bank,
            history,
        })
    }

    /// Apply a suggestion.
    ///
    /// Validation and operation failures are reported through the returned
    /// record's status. Snapshot and history persistence failures are errors.
    pub async fn execute_refactoring(
        &mut self,
        suggestion: &RefactoringSuggestion,
        approval_id: &str,
        options: ExecuteOptions,
    ) -> Result<RefactoringExecution> {
        let mut execution = RefactoringExecution {
            execution_id: self.new_execution_id(),
            suggestion_id: suggestion.suggestion_id.clone(),
            approval_id: approval_id.to_string(),
            operations: extract_operations(suggestion),
            status: ExecutionStatus::Pending,
            snapshot_id: None,
            validation_results: None,
            actual_impact: None,
            created_at: Utc::now().to_rfc3339(),
            completed_at: None,
            error: None,
            dry_run: options.dry_run,
            affected_files: Vec::new(),
            created_files: Vec::new(),
        };
        tracing::info!(
            "Execution {}: {} operation(s) from suggestion {}",
            execution.execution_id,
            execution.operations.len(),
            execution.suggestion_id
        );

        // Validation
        if options.validate_first || options.dry_run {
            execution.status = ExecutionStatus::Validating;
            let validation = self
                .validator
                .validate_operations(suggestion, &execution.operations, options.dry_run)
                .await;
            let valid = validation.valid;
            if !valid {
                execution.error = Some(format!(
                    "Validation failed: {}",
                    validation.issues.join("; ")
                ));
            }
            execution.validation_results = Some(validation);
            if !valid {
                tracing::warn!("Execution {} failed validation", execution.execution_id);
                return self.finish(execution, ExecutionStatus::Failed).await;
            }
        }

        if options.dry_run {
            tracing::info!("Dry run {}: no changes made", execution.execution_id);
            return self.finish(execution, ExecutionStatus::Completed).await;
        }

        // Pre-change snapshot
        let affected = self.collect_affected(suggestion, &execution).await?;
        let snapshot_id = snapshot_id_for(&execution.execution_id);
        let tokens_before = match self.snapshot_batch(&snapshot_id, &affected).await {
            Ok(tokens) => tokens,
            Err(e) => {
                execution.error = Some(format!("Snapshot failed: {}", e));
                self.finish(execution, ExecutionStatus::Failed).await?;
                return Err(e);
            }
        };
        execution.snapshot_id = Some(snapshot_id);
        execution.affected_files = affected.clone();

        // Execution
        execution.status = ExecutionStatus::Executing;
        self.persist(&execution).await?;

        let mut created: BTreeSet<String> = BTreeSet::new();
        let mut modified: BTreeSet<String> = affected.iter().cloned().collect();
        let total = execution.operations.len();

        for idx in 0..total {
            let op = &mut execution.operations[idx];
            op.status = OperationStatus::Executing;
            tracing::info!(
                "Execute [{}/{}]: {} - {}",
                idx + 1,
                total,
                op.operation_type(),
                op.target_file
            );

            match self.operations.execute(op).await {
                Ok(change) => {
                    op.status = OperationStatus::Completed;
                    track_change(&change, &affected, &mut created, &mut modified);
                }
                Err(e) => {
                    tracing::error!("Operation failed: {} - {}", op.operation_id, e);
                    op.status = OperationStatus::Failed;
                    op.error = Some(e.to_string());
                    execution.error = Some(format!(
                        "Operation {} ({}) failed: {}",
                        op.operation_id,
                        op.operation_type(),
                        e
                    ));
                    break;
                }
            }
        }
        execution.created_files = created.iter().cloned().collect();

        if execution.error.is_some() {
            return self.finish(execution, ExecutionStatus::Failed).await;
        }

        execution.actual_impact = Some(
            self.measure_impact(suggestion, tokens_before, &modified, &created)
                .await,
        );
        self.finish(execution, ExecutionStatus::Completed).await
    }

    /// Look up an execution.
    pub fn get_execution(&self, execution_id: &str) -> Option<&RefactoringExecution> {
        self.history.executions.get(execution_id)
    }

    /// Executions, newest first.
    pub fn list_executions(&self, limit: Option<usize>) -> Vec<&RefactoringExecution> {
        let mut executions: Vec<_> = self.history.executions.values().collect();
        executions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.execution_id.cmp(&a.execution_id))
        });
        if let Some(limit) = limit {
            executions.truncate(limit);
        }
        executions
    }

    async fn finish(
        &mut self,
        mut execution: RefactoringExecution,
        status: ExecutionStatus,
    ) -> Result<RefactoringExecution> {
        execution.status = status;
        execution.completed_at = Some(Utc::now().to_rfc3339());
        self.persist(&execution).await?;
        tracing::info!("Execution {} {:?}", execution.execution_id, status);
        Ok(execution)
    }

    async fn persist(&mut self, execution: &RefactoringExecution) -> Result<()> {
        self.history
            .executions
            .insert(execution.execution_id.clone(), execution.clone());
        save_history(&mut self.history, self.bank.root()).await
    }

    fn new_execution_id(&self) -> String {
        let stamp = Utc::now().format("%Y%m%d%H%M%S%6f").to_string();
        let mut id = format!("{}{}", EXECUTION_PREFIX, stamp);
        let mut n = 1;
        while self.history.executions.contains_key(&id) {
            id = format!("{}{}-{}", EXECUTION_PREFIX, stamp, n);
            n += 1;
        }
        id
    }

    /// Existing files the batch may touch; directories expand to their files.
    async fn collect_affected(
        &self,
        suggestion: &RefactoringSuggestion,
        execution: &RefactoringExecution,
    ) -> Result<Vec<String>> {
        let mut candidates: Vec<String> = suggestion.affected_files.clone();
        for op in &execution.operations {
            candidates.push(op.target_file.clone());
            if let OperationParameters::Consolidate { source_files, .. } = &op.parameters {
                candidates.extend(source_files.iter().cloned());
            }
        }

        let files = self.bank.files();
        let mut affected: BTreeSet<String> = BTreeSet::new();
        for candidate in candidates {
            let Ok(path) = normalize_relative(&candidate) else {
                continue;
            };
            if path.is_empty() || !files.exists(&path).await {
                continue;
            }
            if files.is_dir(&path).await {
                affected.extend(list_files_under(self.bank.root(), &files.resolve(&path)?));
            } else {
                affected.insert(path);
            }
        }
        Ok(affected.into_iter().collect())
    }

    /// Snapshot every affected file under `snapshot_id`. Returns total tokens.
    async fn snapshot_batch(&self, snapshot_id: &str, affected: &[String]) -> Result<usize> {
        let mut tokens = 0;
        for file in affected {
            let version = self
                .bank
                .snapshot_file(
                    file,
                    ChangeType::Modified,
                    Some(format!("{}{}", PRE_REFACTORING_MARKER, snapshot_id)),
                    Some(snapshot_id.to_string()),
                )
                .await?;
            tokens += version.token_count;
        }
        tracing::info!("Snapshot {}: {} file(s)", snapshot_id, affected.len());
        Ok(tokens)
    }

    async fn measure_impact(
        &self,
        suggestion: &RefactoringSuggestion,
        tokens_before: usize,
        modified: &BTreeSet<String>,
        created: &BTreeSet<String>,
    ) -> ActualImpact {
        let mut tokens_after = 0;
        for file in modified.union(created) {
            if let Ok((content, _)) = self.bank.files().read_file(file).await {
                tokens_after += estimate_tokens(&content);
            }
        }

        let estimate = &suggestion.estimated_impact;
        ActualImpact {
            files_affected: modified.union(created).count(),
            tokens_before,
            tokens_after,
            token_savings: tokens_before as i64 - tokens_after as i64,
            estimated_token_savings: estimate.token_savings,
            complexity_reduction: estimate.complexity_reduction,
            risk_level: estimate.risk_level,
        }
    }
}

/// Fold one operation's changes into the batch's created/modified sets.
fn track_change(
    change: &AppliedChange,
    pre_existing: &[String],
    created: &mut BTreeSet<String>,
    modified: &mut BTreeSet<String>,
) {
    for path in &change.modified {
        modified.insert(path.clone());
    }
    for path in &change.removed {
        created.remove(path);
    }
    for path in &change.created {
        if pre_existing.contains(path) {
            modified.insert(path.clone());
        } else {
            created.insert(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_id_for() {
        assert_eq!(
            snapshot_id_for("exec-20240101120000000001"),
            "snapshot-20240101120000000001"
        );
        assert_eq!(snapshot_id_for("custom"), "snapshot-custom");
    }

    #[test]
    fn test_execute_options_default() {
        let options = ExecuteOptions::default();
        assert!(!options.dry_run);
        assert!(options.validate_first);
    }

    #[test]
    fn test_track_change() {
        let pre = vec!["a.md".to_string()];
        let mut created = BTreeSet::new();
        let mut modified = BTreeSet::new();

        let first = AppliedChange {
            created: vec!["new.md".to_string(), "a.md".to_string()],
            ..AppliedChange::default()
        };
        track_change(&first, &pre, &mut created, &mut modified);
        assert!(created.contains("new.md"));
        assert!(modified.contains("a.md"));

        let second = AppliedChange {
            removed: vec!["new.md".to_string()],
            created: vec!["moved/new.md".to_string()],
            ..AppliedChange::default()
        };
        track_change(&second, &pre, &mut created, &mut modified);
        assert!(!created.contains("new.md"));
        assert!(created.contains("moved/new.md"));
    }
}
