//! History command implementation.
//!
//! Lists executions recorded in `refactoring-history.json`, or shows one.

use super::execute::{print_execution, status_label};
use super::open_bank;
use crate::core::executor::RefactoringExecutor;
use crate::core::rollback::RollbackManager;
use crate::models::execution::ExecutionStatus;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// List recent executions.
pub async fn list_history(project: &Path, limit: usize) -> Result<()> {
    println!("{}", "[HISTORY] Executions".bold().cyan());
    println!();

    let bank = open_bank(project).await?;
    let executor = RefactoringExecutor::open(bank.clone()).await?;
    let rollbacks = RollbackManager::open(bank).await?;

    let executions = executor.list_executions(Some(limit));
    if executions.is_empty() {
        println!("No executions found.");
        return Ok(());
    }

    println!(
        "{:<32} {:<26} {:<6} {}",
        "Execution ID".bold(),
        "Status".bold(),
        "Ops".bold(),
        "Suggestion".bold()
    );
    println!("{}", "-".repeat(90));

    for execution in executions {
        let status = if rollbacks.was_rolled_back(&execution.execution_id) {
            ExecutionStatus::RolledBack
        } else {
            execution.status
        };
        let mut label = status_label(status).to_string();
        if !status.is_terminal() {
            // Persisted mid-run and never finished.
            label = format!("{} (interrupted)", label);
        } else if execution.dry_run {
            label = format!("{} (dry run)", label);
        }
        println!(
            "{:<32} {:<26} {:<6} {}",
            execution.execution_id,
            label,
            execution.operations.len(),
            execution.suggestion_id
        );
    }

    Ok(())
}

/// Show one execution in detail.
pub async fn show_execution(project: &Path, execution_id: &str) -> Result<()> {
    println!("{} {}", "[HISTORY] Execution:".bold().cyan(), execution_id);
    println!();

    let bank = open_bank(project).await?;
    let executor = RefactoringExecutor::open(bank.clone()).await?;
    let rollbacks = RollbackManager::open(bank).await?;

    let Some(execution) = executor.get_execution(execution_id) else {
        return Err(crate::Error::ExecutionNotFound(execution_id.to_string()));
    };

    println!("  {} {}", "Suggestion:".bold(), execution.suggestion_id);
    println!("  {} {}", "Approval:".bold(), execution.approval_id);
    println!("  {} {}", "Created:".bold(), execution.created_at);
    if let Some(completed) = &execution.completed_at {
        println!("  {} {}", "Completed:".bold(), completed);
    }
    print_execution(execution);

    let related: Vec<_> = rollbacks
        .list_rollbacks()
        .into_iter()
        .filter(|r| r.execution_id == execution_id)
        .collect();
    if !related.is_empty() {
        println!();
        println!("{}", "Rollbacks:".bold());
        for record in related {
            println!(
                "  {} {:?} - {} restored, {} conflict(s)",
                record.rollback_id,
                record.status,
                record.files_restored.len(),
                record.conflicts_detected.len()
            );
        }
    }

    Ok(())
}
