//! Refactoring execution data model.

use super::operation::RefactoringOperation;
use super::suggestion::RiskLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One orchestrated attempt to apply a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactoringExecution {
    /// Execution ID (`exec-<timestamp>`).
    pub execution_id: String,
    /// Suggestion that was applied.
    pub suggestion_id: String,
    /// Approval reference supplied by the caller.
    pub approval_id: String,
    /// Operations in execution order.
    pub operations: Vec<RefactoringOperation>,
    /// Execution status.
    pub status: ExecutionStatus,
    /// Pre-change snapshot batch. Rollback is possible only when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_results: Option<ValidationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_impact: Option<ActualImpact>,
    /// Creation timestamp.
    pub created_at: String,
    /// Completion timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether this was a preview run.
    #[serde(default)]
    pub dry_run: bool,
    /// Existing files captured in the snapshot batch.
    #[serde(default)]
    pub affected_files: Vec<String>,
    /// Paths that did not exist before the execution and were created by it.
    #[serde(default)]
    pub created_files: Vec<String>,
}

impl RefactoringExecution {
    /// Whether this execution can be rolled back.
    pub fn can_rollback(&self) -> bool {
        self.snapshot_id.is_some()
    }
}

/// Execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Validating,
    Executing,
    Completed,
    Failed,
    /// Never stored on an execution; derived by history views from the rollback log.
    RolledBack,
}

impl ExecutionStatus {
    /// Whether the execution has finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::RolledBack)
    }
}

/// Outcome of validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when there are no blocking issues.
    pub valid: bool,
    /// Blocking problems.
    pub issues: Vec<String>,
    /// Informational findings.
    pub warnings: Vec<String>,
    /// Number of operations validated.
    pub operations_count: usize,
}

/// Measured effect of a completed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualImpact {
    /// Distinct files touched or created.
    pub files_affected: usize,
    /// Tokens before the execution, summed over affected files.
    pub tokens_before: usize,
    /// Tokens after the execution, summed over affected files.
    pub tokens_after: usize,
    /// `tokens_before - tokens_after`.
    pub token_savings: i64,
    /// Estimated savings from the suggestion, for comparison.
    pub estimated_token_savings: i64,
    /// Complexity reduction carried from the estimate.
    pub complexity_reduction: f64,
    pub risk_level: RiskLevel,
}

/// Execution history file (`refactoring-history.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionHistory {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub executions: BTreeMap<String, RefactoringExecution>,
}
