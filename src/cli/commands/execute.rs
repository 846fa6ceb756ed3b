//! Execute command implementation.
//!
//! Reads a suggestion JSON file, validates it and applies its operations,
//! recording the execution in the project's history.

use super::open_bank;
use crate::core::executor::{ExecuteOptions, RefactoringExecutor};
use crate::models::execution::{ExecutionStatus, RefactoringExecution};
use crate::models::operation::OperationStatus;
use crate::models::suggestion::parse_suggestion;
use crate::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Execute a suggestion file.
pub async fn execute_suggestion(
    project: &Path,
    suggestion_file: &Path,
    dry_run: bool,
    skip_validation: bool,
    approval_id: &str,
) -> Result<()> {
    println!("{}", "[EXEC] Executing suggestion...".bold().cyan());
    println!();

    if !suggestion_file.exists() {
        return Err(crate::Error::PathNotFound(
            suggestion_file.display().to_string(),
        ));
    }

    println!("[INFO] Loading suggestion: {}", suggestion_file.display());
    let raw = tokio::fs::read_to_string(suggestion_file).await?;
    let suggestion = parse_suggestion(serde_json::from_str(&raw)?)?;

    println!("  {} {}", "Suggestion:".bold(), suggestion.suggestion_id);
    println!("  {} {:?}", "Type:".bold(), suggestion.refactoring_type);
    println!("  {} {}", "Files:".bold(), suggestion.affected_files.join(", "));
    println!("  {} {}", "Actions:".bold(), suggestion.actions.len());
    println!();

    let bank = open_bank(project).await?;
    let options = ExecuteOptions {
        dry_run,
        validate_first: bank.config().validate_first && !skip_validation,
    };
    let mut executor = RefactoringExecutor::open(bank).await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(if dry_run { "Validating..." } else { "Applying operations..." });
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let execution = executor
        .execute_refactoring(&suggestion, approval_id, options)
        .await;
    pb.finish_and_clear();
    let execution = execution?;

    print_execution(&execution);
    println!();

    match execution.status {
        ExecutionStatus::Completed if execution.dry_run => {
            println!("{}", "[OK] Dry run complete - no changes were made".green());
        }
        ExecutionStatus::Completed => {
            println!("{}", "[OK] Execution completed successfully!".green());
            println!();
            println!("{}", "[Next Steps]".bold().yellow());
            println!(
                "  To undo changes: {}",
                format!("membank rollback {}", execution.execution_id).cyan()
            );
        }
        _ => {
            println!("{}", "[FAILED] Execution did not complete".red().bold());
            if execution.can_rollback() {
                println!();
                println!(
                    "  Applied operations were kept. To undo them: {}",
                    format!("membank rollback {}", execution.execution_id).cyan()
                );
            }
        }
    }

    Ok(())
}

/// Print an execution record.
pub fn print_execution(execution: &RefactoringExecution) {
    println!("  {} {}", "Execution:".bold(), execution.execution_id);
    println!("  {} {}", "Status:".bold(), status_label(execution.status));
    if let Some(snapshot_id) = &execution.snapshot_id {
        println!("  {} {}", "Snapshot:".bold(), snapshot_id);
    }

    if let Some(validation) = &execution.validation_results {
        for issue in &validation.issues {
            println!("  {} {}", "[ISSUE]".red(), issue);
        }
        for warning in &validation.warnings {
            println!("  {} {}", "[WARN]".yellow(), warning);
        }
    }

    if !execution.operations.is_empty() {
        println!();
        for op in &execution.operations {
            let mark = match op.status {
                OperationStatus::Completed => "[OK]".green(),
                OperationStatus::Failed => "[FAIL]".red(),
                OperationStatus::Executing => "[..]".yellow(),
                OperationStatus::Pending => "[--]".dimmed(),
            };
            println!("  {} {} {}", mark, op.operation_type(), op.target_file);
            if let Some(error) = &op.error {
                println!("       {}", error.red());
            }
        }
    }

    if let Some(impact) = &execution.actual_impact {
        println!();
        println!("  {} {}", "Files affected:".bold(), impact.files_affected);
        println!(
            "  {} {} -> {} ({:+} saved, {:+} estimated)",
            "Tokens:".bold(),
            impact.tokens_before,
            impact.tokens_after,
            impact.token_savings,
            impact.estimated_token_savings
        );
    }

    if let Some(error) = &execution.error {
        println!("  {} {}", "Error:".bold(), error.red());
    }
}

/// Colored status label.
pub fn status_label(status: ExecutionStatus) -> colored::ColoredString {
    match status {
        ExecutionStatus::Pending => "pending".yellow(),
        ExecutionStatus::Validating => "validating".yellow(),
        ExecutionStatus::Executing => "executing".yellow(),
        ExecutionStatus::Completed => "completed".green(),
        ExecutionStatus::Failed => "failed".red(),
        ExecutionStatus::RolledBack => "rolled_back".magenta(),
    }
}
