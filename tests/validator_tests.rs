//! Integration tests for execution validation.
//!
//! Tests cover:
//! - Blocking issues (missing targets, existing destinations)
//! - Warnings (external edits, inbound links, impact regressions)
//! - Ordered simulation across a batch

use membank::core::bank::MemoryBank;
use membank::core::validator::ExecutionValidator;
use membank::models::config::Config;
use membank::models::suggestion::{parse_suggestion, RefactoringSuggestion};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup(dir: &Path) -> (Arc<MemoryBank>, ExecutionValidator) {
    let bank = MemoryBank::open(dir, Config::default()).await.unwrap();
    let validator = ExecutionValidator::new(bank.clone());
    (bank, validator)
}

fn suggestion(value: serde_json::Value) -> RefactoringSuggestion {
    parse_suggestion(value).unwrap()
}

// ========== ISSUE TESTS ==========

#[tokio::test]
async fn test_delete_missing_file_is_single_issue() {
    let temp_dir = TempDir::new().unwrap();
    let (_bank, validator) = setup(temp_dir.path()).await;

    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [{"action_type": "delete", "target_file": "ghost.md"}]
    }));

    let result = validator.validate(&s, false).await;
    assert!(!result.valid);
    assert_eq!(result.issues.len(), 1);
    assert!(result.issues[0].contains("ghost.md"));
    assert_eq!(result.operations_count, 1);
}

#[tokio::test]
async fn test_create_existing_file_is_issue() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.md"), "# A\n").unwrap();
    let (_bank, validator) = setup(temp_dir.path()).await;

    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [{"action_type": "create", "target_file": "a.md", "details": {"content": "x"}}]
    }));

    let result = validator.validate(&s, true).await;
    assert!(!result.valid);
    assert!(result.issues[0].contains("a.md"));
}

#[tokio::test]
async fn test_move_onto_existing_destination_is_issue() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.md"), "a").unwrap();
    std::fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
    std::fs::write(temp_dir.path().join("docs/a.md"), "other").unwrap();
    let (_bank, validator) = setup(temp_dir.path()).await;

    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [{"action_type": "move", "target_file": "a.md", "details": {"destination_file": "docs/"}}]
    }));

    let result = validator.validate(&s, true).await;
    assert!(!result.valid);
    assert!(result.issues.iter().any(|i| i.contains("docs/a.md")));
}

#[tokio::test]
async fn test_consolidation_missing_source_is_issue() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.md"), "# A\n\n## Setup\n\nx\n").unwrap();
    let (_bank, validator) = setup(temp_dir.path()).await;

    let s = suggestion(json!({
        "refactoring_type": "consolidation",
        "affected_files": ["a.md", "missing.md"],
        "actions": [{"action_type": "consolidate", "target_file": "a.md",
                     "details": {"destination_file": "merged.md", "sections": ["Setup"]}}]
    }));

    let result = validator.validate(&s, true).await;
    assert!(!result.valid);
    assert_eq!(result.issues.len(), 1);
    assert!(result.issues[0].contains("missing.md"));
}

#[tokio::test]
async fn test_empty_suggestion_is_issue() {
    let temp_dir = TempDir::new().unwrap();
    let (_bank, validator) = setup(temp_dir.path()).await;

    let s = suggestion(json!({"refactoring_type": "split", "actions": []}));

    let result = validator.validate(&s, true).await;
    assert!(!result.valid);
    assert_eq!(result.operations_count, 0);
}

#[tokio::test]
async fn test_later_operation_sees_earlier_creation() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("big.md"),
        "# Big\n\n## Intro\n\nhi\n\n## Appendix\n\nmore\n",
    )
    .unwrap();
    let (_bank, validator) = setup(temp_dir.path()).await;

    let s = suggestion(json!({
        "refactoring_type": "split",
        "affected_files": ["big.md"],
        "actions": [
            {"action_type": "split", "target_file": "big.md",
             "details": {"destination_file": "part2.md", "sections": ["Appendix"]}},
            {"action_type": "modify", "target_file": "part2.md", "details": {"content": "# Part 2\n"}}
        ]
    }));

    let result = validator.validate(&s, true).await;
    assert!(result.valid, "issues: {:?}", result.issues);
    assert_eq!(result.operations_count, 2);
}

// ========== WARNING TESTS ==========

#[tokio::test]
async fn test_external_edit_is_warning() {
    let temp_dir = TempDir::new().unwrap();
    let (bank, validator) = setup(temp_dir.path()).await;
    bank.write_document("a.md", "# A\n", None).await.unwrap();
    std::fs::write(temp_dir.path().join("a.md"), "# A\n\nedited elsewhere\n").unwrap();

    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [{"action_type": "modify", "target_file": "a.md", "details": {"content": "# A2\n"}}]
    }));

    let result = validator.validate(&s, true).await;
    assert!(result.valid);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("a.md") && w.contains("not recorded")));
}

#[tokio::test]
async fn test_tracked_file_is_warning() {
    let temp_dir = TempDir::new().unwrap();
    let (bank, validator) = setup(temp_dir.path()).await;
    bank.write_document("a.md", "# A\n", None).await.unwrap();

    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [{"action_type": "modify", "target_file": "a.md", "details": {"content": "# A2\n"}}]
    }));

    let result = validator.validate(&s, true).await;
    assert!(result.valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("tracked metadata"));
}

#[tokio::test]
async fn test_inbound_links_only_outside_dry_run() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("old.md"), "# Old\n").unwrap();
    std::fs::write(temp_dir.path().join("index.md"), "See [[old]] for details.\n").unwrap();
    let (_bank, validator) = setup(temp_dir.path()).await;

    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [{"action_type": "delete", "target_file": "old.md"}]
    }));

    let preview = validator.validate(&s, true).await;
    assert!(preview.valid);
    assert!(preview.warnings.is_empty());

    let full = validator.validate(&s, false).await;
    assert!(full.valid);
    assert_eq!(full.warnings.len(), 1);
    assert!(full.warnings[0].contains("index.md"));
}

#[tokio::test]
async fn test_impact_regression_warnings() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.md"), "a").unwrap();
    let (_bank, validator) = setup(temp_dir.path()).await;

    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [{"action_type": "rename", "target_file": "a.md", "details": {"new_name": "b.md"}}],
        "estimated_impact": {"token_savings": -1000, "complexity_reduction": -0.5, "risk_level": "high"}
    }));

    let result = validator.validate(&s, true).await;
    assert!(result.valid);
    assert!(result.warnings.iter().any(|w| w.contains("token")));
    assert!(result.warnings.iter().any(|w| w.contains("complexity")));
}

#[tokio::test]
async fn test_validation_does_not_mutate() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.md"), "a").unwrap();
    let (_bank, validator) = setup(temp_dir.path()).await;

    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [{"action_type": "delete", "target_file": "a.md"}]
    }));

    validator.validate(&s, false).await;
    assert!(temp_dir.path().join("a.md").exists());
    assert!(!temp_dir.path().join("refactoring-history.json").exists());
}
