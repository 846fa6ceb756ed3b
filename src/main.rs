//! Memory Bank CLI
//!
//! Applies refactoring suggestions to a directory of markdown documents and
//! rolls them back on demand.

use clap::Parser;
use membank::cli::{
    args::{Cli, Commands, VersionsAction},
    commands::{execute, history, rollback, versions},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let project = cli.project.as_path();

    // Run the appropriate command
    match cli.command {
        Commands::Execute {
            suggestion,
            dry_run,
            skip_validation,
            approval_id,
        } => {
            execute::execute_suggestion(project, &suggestion, dry_run, skip_validation, &approval_id)
                .await?;
        }

        Commands::Rollback {
            execution_id,
            force,
            preview,
        } => {
            rollback::rollback(project, &execution_id, force, preview).await?;
        }

        Commands::History {
            execution_id,
            limit,
        } => match execution_id {
            Some(id) => history::show_execution(project, &id).await?,
            None => history::list_history(project, limit).await?,
        },

        Commands::Versions { action } => match action {
            VersionsAction::List { file } => {
                versions::list_versions(project, &file).await?;
            }
            VersionsAction::Prune { file } => {
                versions::prune_versions(project, &file).await?;
            }
            VersionsAction::Usage => {
                versions::disk_usage(project).await?;
            }
            VersionsAction::Cleanup => {
                versions::cleanup(project).await?;
            }
        },
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("membank=debug")
    } else {
        EnvFilter::new("membank=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
