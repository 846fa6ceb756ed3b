//! CLI command implementations.

pub mod execute;
pub mod history;
pub mod rollback;
pub mod versions;

use crate::core::bank::MemoryBank;
use crate::models::config::load_config;
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// Open the memory bank at `project` with its configuration.
pub async fn open_bank(project: &Path) -> Result<Arc<MemoryBank>> {
    if !project.is_dir() {
        return Err(crate::Error::PathNotFound(project.display().to_string()));
    }
    let config = load_config(project);
    MemoryBank::open(project, config).await
}
