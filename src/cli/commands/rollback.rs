//! Rollback command implementation.
//!
//! Restores the files touched by a previous execution from its
//! pre-refactoring snapshot batch.

use super::open_bank;
use crate::core::rollback::RollbackManager;
use crate::models::rollback::RollbackStatus;
use crate::Result;
use colored::Colorize;

/// Roll back an execution, or preview the rollback.
pub async fn rollback(
    project: &std::path::Path,
    execution_id: &str,
    force: bool,
    preview: bool,
) -> Result<()> {
    println!("{}", "[ROLLBACK] Rollback command".bold().cyan());
    println!();

    let bank = open_bank(project).await?;
    let preserve = bank.config().preserve_manual_changes && !force;
    let mut manager = RollbackManager::open(bank).await?;

    if manager.was_rolled_back(execution_id) {
        println!(
            "{}",
            format!("[WARNING] {} was already rolled back", execution_id).yellow()
        );
        println!();
    }

    if preview {
        let impact = manager.analyze_rollback_impact(execution_id).await?;
        println!("{}", "[PREVIEW] Showing what would be done:".bold().yellow());
        println!();
        println!("  {} {}", "Execution:".bold(), impact.execution_id);
        println!(
            "  {} {}",
            "Snapshot:".bold(),
            impact.snapshot_id.as_deref().unwrap_or("(none)")
        );

        if !impact.can_rollback {
            println!();
            println!("{}", "[WARNING] Nothing to roll back for this execution".yellow());
            return Ok(());
        }

        for file in &impact.files_to_restore {
            println!("  {} {}", "[RESTORE]".green(), file);
        }
        for file in &impact.files_to_remove {
            println!("  {} {}", "[REMOVE]".cyan(), file);
        }
        for conflict in &impact.conflicts {
            let label = if preserve { "[SKIP]" } else { "[OVERWRITE]" };
            println!("  {} {} ({})", label.yellow(), conflict.file, conflict.reason);
        }

        println!();
        println!("{}", "[Next Steps]".bold().cyan());
        println!("  To actually execute the rollback:");
        println!(
            "     {}",
            format!("membank rollback {}", execution_id).bold()
        );
        return Ok(());
    }

    if !preserve {
        println!(
            "{}",
            "[WARNING] Files edited since the execution will be overwritten (a backup is kept)"
                .bold()
                .yellow()
        );
        println!();
    }

    let record = manager.rollback_refactoring(execution_id, preserve).await?;

    println!("  {} {}", "Rollback:".bold(), record.rollback_id);
    for file in &record.files_restored {
        println!("  {} {}", "[OK]".green(), file);
    }
    for conflict in &record.conflicts_detected {
        println!("  {} {} ({})", "[CONFLICT]".yellow(), conflict.file, conflict.reason);
    }
    println!();

    match record.status {
        RollbackStatus::Completed if record.conflicts_detected.is_empty() => {
            println!("{}", "[OK] Rollback completed successfully!".green());
        }
        RollbackStatus::Completed => {
            println!(
                "{}",
                "[WARNING] Rollback completed; conflicting files were kept as-is".yellow()
            );
            println!();
            println!("{}", "[Next Steps]".bold().cyan());
            println!("  To overwrite them as well:");
            println!(
                "     {}",
                format!("membank rollback {} --force", execution_id).bold()
            );
        }
        _ => {
            println!(
                "{} {}",
                "[FAILED] Rollback failed:".red().bold(),
                record.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}
