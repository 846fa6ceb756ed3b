//! Versions command implementation.
//!
//! Lists, prunes and cleans up document snapshots under `.membank/history/`.

use super::open_bank;
use crate::utils::fs::normalize_relative;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// List snapshots of a document.
pub async fn list_versions(project: &Path, file: &str) -> Result<()> {
    let file = normalize_relative(file)?;
    println!("{} {}", "[VERSIONS]".bold().cyan(), file);
    println!();

    let bank = open_bank(project).await?;
    let Some(meta) = bank.file_metadata(&file).await else {
        println!("No versions recorded for {}.", file);
        return Ok(());
    };

    println!(
        "{:<8} {:<14} {:<10} {:<28} {}",
        "Version".bold(),
        "Type".bold(),
        "Tokens".bold(),
        "Timestamp".bold(),
        "Description".bold()
    );
    println!("{}", "-".repeat(90));

    for version in meta.version_history.iter().rev() {
        println!(
            "{:<8} {:<14} {:<10} {:<28} {}",
            version.version,
            format!("{:?}", version.change_type).to_lowercase(),
            version.token_count,
            version.timestamp,
            version.change_description
        );
    }

    if meta.deleted_at.is_some() {
        println!();
        println!("{}", "(document has been removed)".yellow());
    }

    Ok(())
}

/// Prune a document's snapshots to the configured retention limit.
pub async fn prune_versions(project: &Path, file: &str) -> Result<()> {
    let file = normalize_relative(file)?;
    let bank = open_bank(project).await?;
    let removed = bank.prune(&file).await?;

    if removed.is_empty() {
        println!(
            "Nothing to prune for {} (keeping {}).",
            file,
            bank.versions().keep_versions()
        );
    } else {
        println!(
            "{} removed {} snapshot(s) of {}",
            "[OK]".green(),
            removed.len(),
            file
        );
    }
    Ok(())
}

/// Show snapshot disk usage.
pub async fn disk_usage(project: &Path) -> Result<()> {
    println!("{}", "[VERSIONS] Disk usage".bold().cyan());
    println!();

    let bank = open_bank(project).await?;
    let usage = bank.versions().get_disk_usage().await?;

    for (file, count) in &usage.per_file {
        println!("  {:<50} {:>5} snapshot(s)", file, count);
    }
    println!();
    println!(
        "  {} {} snapshot(s), {}",
        "Total:".bold(),
        usage.snapshot_count,
        format_size(usage.total_bytes)
    );
    Ok(())
}

/// Remove snapshots of documents that no longer exist.
pub async fn cleanup(project: &Path) -> Result<()> {
    let bank = open_bank(project).await?;
    let removed = bank.cleanup_orphaned_snapshots().await?;
    println!("{} removed {} orphaned snapshot(s)", "[OK]".green(), removed);
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
