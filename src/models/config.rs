//! Configuration model.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of snapshots retained per file before pruning.
    pub keep_versions: usize,
    /// Maximum wait for a per-file write lock, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Estimated token regression (negative savings) beyond which validation warns.
    pub token_regression_threshold: i64,
    /// Whether executions validate before touching files.
    pub validate_first: bool,
    /// Whether rollbacks skip files edited since the execution.
    pub preserve_manual_changes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep_versions: crate::core::versions::DEFAULT_KEEP_VERSIONS,
            lock_timeout_ms: 5_000,
            token_regression_threshold: 500,
            validate_first: true,
            preserve_manual_changes: true,
        }
    }
}

/// Get the user configuration directory path.
fn dirs_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("membank")
}

/// Load configuration for a project.
///
/// Looks in `<project>/.membank/config.toml`, then the user config directory.
pub fn load_config(project_root: &Path) -> Config {
    let candidates = [
        project_root.join(crate::APP_DIR).join("config.toml"),
        dirs_config_path().join("config.toml"),
    ];

    for config_path in candidates.iter() {
        if !config_path.exists() {
            continue;
        }
        match std::fs::read_to_string(config_path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::debug!("Loaded config from {:?}", config_path);
                    return config;
                }
                Err(e) => tracing::warn!("Ignoring invalid config {:?}: {}", config_path, e),
            },
            Err(e) => tracing::warn!("Failed to read config {:?}: {}", config_path, e),
        }
    }

    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.keep_versions, 10);
        assert!(config.validate_first);
        assert!(config.preserve_manual_changes);
    }

    #[test]
    fn test_load_project_config_partial() {
        let dir = tempfile::TempDir::new().unwrap();
        let app_dir = dir.path().join(crate::APP_DIR);
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), "keep_versions = 3\n").unwrap();

        let config = load_config(dir.path());
        assert_eq!(config.keep_versions, 3);
        assert_eq!(config.lock_timeout_ms, 5_000);
    }
}
