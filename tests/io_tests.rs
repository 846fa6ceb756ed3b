//! Integration tests for persisted state.
//!
//! Tests cover:
//! - Execution and rollback history save/load
//! - Metadata index persistence
//! - Project configuration loading

use membank::core::bank::MemoryBank;
use membank::core::history::{history_path, load_history, save_history, EXECUTION_HISTORY_FILE};
use membank::models::config::{load_config, Config};
use membank::models::execution::{ExecutionHistory, ExecutionStatus, RefactoringExecution};
use membank::models::rollback::{RollbackHistory, RollbackRecord, RollbackStatus};
use std::fs;
use tempfile::TempDir;

fn execution(id: &str) -> RefactoringExecution {
    RefactoringExecution {
        execution_id: id.to_string(),
        suggestion_id: "s1".to_string(),
        approval_id: "a1".to_string(),
        operations: vec![],
        status: ExecutionStatus::Completed,
        snapshot_id: Some(format!("snapshot-{}", id)),
        validation_results: None,
        actual_impact: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        completed_at: Some("2024-01-01T00:00:01Z".to_string()),
        error: None,
        dry_run: false,
        affected_files: vec!["a.md".to_string()],
        created_files: vec![],
    }
}

// ========== HISTORY I/O TESTS ==========

#[tokio::test]
async fn test_save_and_load_execution_history() {
    let temp_dir = TempDir::new().unwrap();

    let mut history = ExecutionHistory::default();
    history
        .executions
        .insert("exec-1".to_string(), execution("exec-1"));
    save_history(&mut history, temp_dir.path()).await.unwrap();

    assert_eq!(
        history_path::<ExecutionHistory>(temp_dir.path()),
        temp_dir.path().join(EXECUTION_HISTORY_FILE)
    );

    let loaded: ExecutionHistory = load_history(temp_dir.path()).await.unwrap();
    assert_eq!(loaded.executions.len(), 1);
    assert_eq!(loaded.executions["exec-1"], execution("exec-1"));
    assert_eq!(loaded.last_updated, history.last_updated);
}

#[tokio::test]
async fn test_history_rewrite_leaves_no_temp_files() {
    let temp_dir = TempDir::new().unwrap();

    let mut history = RollbackHistory::default();
    for i in 0..3 {
        let id = format!("rollback-{}", i);
        history.rollbacks.insert(
            id.clone(),
            RollbackRecord {
                rollback_id: id,
                execution_id: "exec-1".to_string(),
                status: RollbackStatus::Completed,
                conflicts_detected: vec![],
                files_restored: vec!["a.md".to_string()],
                preserve_manual_edits: true,
                created_at: "2024-01-01T00:00:00Z".to_string(),
                completed_at: None,
                error: None,
            },
        );
        save_history(&mut history, temp_dir.path()).await.unwrap();
    }

    let names: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["rollbacks.json".to_string()]);

    let loaded: RollbackHistory = load_history(temp_dir.path()).await.unwrap();
    assert_eq!(loaded.rollbacks.len(), 3);
}

#[tokio::test]
async fn test_load_history_tolerates_missing_fields() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(EXECUTION_HISTORY_FILE),
        r#"{"executions": {}}"#,
    )
    .unwrap();

    let loaded: ExecutionHistory = load_history(temp_dir.path()).await.unwrap();
    assert!(loaded.executions.is_empty());
    assert!(loaded.last_updated.is_empty());
}

#[tokio::test]
async fn test_corrupt_history_is_error() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(EXECUTION_HISTORY_FILE), "{not json").unwrap();

    let result: membank::Result<ExecutionHistory> = load_history(temp_dir.path()).await;
    assert!(result.is_err());
}

// ========== INDEX I/O TESTS ==========

#[tokio::test]
async fn test_index_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let hash = {
        let bank = MemoryBank::open(temp_dir.path(), Config::default()).await.unwrap();
        bank.write_document("a.md", "# A\n", None).await.unwrap()
    };

    let bank = MemoryBank::open(temp_dir.path(), Config::default()).await.unwrap();
    let meta = bank.file_metadata("a.md").await.unwrap();
    assert_eq!(meta.content_hash, hash);
    assert_eq!(meta.version_history.len(), 1);
    assert!(temp_dir.path().join(".membank/index.json").exists());
}

// ========== CONFIG TESTS ==========

#[test]
fn test_project_config_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".membank")).unwrap();
    fs::write(
        temp_dir.path().join(".membank/config.toml"),
        "keep_versions = 3\npreserve_manual_changes = false\n",
    )
    .unwrap();

    let config = load_config(temp_dir.path());
    assert_eq!(config.keep_versions, 3);
    assert!(!config.preserve_manual_changes);
    assert_eq!(config.lock_timeout_ms, Config::default().lock_timeout_ms);
}
