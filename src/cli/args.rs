//! Command line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Memory Bank - Transactional refactoring for markdown knowledge bases
#[derive(Parser, Debug)]
#[command(name = "membank")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Memory bank root directory
    #[arg(short, long, global = true, value_name = "DIR", default_value = ".")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a refactoring suggestion
    Execute {
        /// Path to the suggestion JSON file
        #[arg(value_name = "SUGGESTION")]
        suggestion: PathBuf,

        /// Dry run - validate and show what would be done
        #[arg(long)]
        dry_run: bool,

        /// Skip validation before executing
        #[arg(long)]
        skip_validation: bool,

        /// Approval reference recorded with the execution
        #[arg(long, value_name = "ID", default_value = "manual")]
        approval_id: String,
    },

    /// Roll back a previous execution
    Rollback {
        /// Execution ID (see `membank history`)
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: String,

        /// Overwrite files edited since the execution (a backup is kept)
        #[arg(long)]
        force: bool,

        /// Show what would be done without changing anything
        #[arg(long)]
        preview: bool,
    },

    /// Show execution history
    History {
        /// Show details of a specific execution
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: Option<String>,

        /// Maximum number of executions to list
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Inspect and maintain document snapshots
    Versions {
        #[command(subcommand)]
        action: VersionsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum VersionsAction {
    /// List snapshots of a document
    List {
        /// Document path, relative to the project
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Prune old snapshots of a document
    Prune {
        /// Document path, relative to the project
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Show snapshot disk usage
    Usage,

    /// Remove snapshots of documents that no longer exist
    Cleanup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rollback() {
        let cli = Cli::parse_from(["membank", "rollback", "exec-1", "--force"]);
        match cli.command {
            Commands::Rollback {
                execution_id,
                force,
                preview,
            } => {
                assert_eq!(execution_id, "exec-1");
                assert!(force);
                assert!(!preview);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_project_flag() {
        let cli = Cli::parse_from(["membank", "versions", "usage", "--project", "/tmp/bank"]);
        assert_eq!(cli.project, PathBuf::from("/tmp/bank"));
        assert!(matches!(
            cli.command,
            Commands::Versions {
                action: VersionsAction::Usage
            }
        ));
    }
}
