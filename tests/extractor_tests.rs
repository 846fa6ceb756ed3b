//! Integration tests for operation extraction.
//!
//! Tests cover:
//! - Determinism
//! - Split, consolidation and reorganization suggestions
//! - Legacy suggestion shape

use membank::core::extractor::extract_operations;
use membank::models::operation::{OperationParameters, OperationStatus, OperationType};
use membank::models::suggestion::{parse_suggestion, RefactoringSuggestion, RefactoringType};
use serde_json::json;

fn suggestion(value: serde_json::Value) -> RefactoringSuggestion {
    parse_suggestion(value).unwrap()
}

// ========== SPLIT TESTS ==========

#[test]
fn test_split_extraction() {
    let s = suggestion(json!({
        "suggestion_id": "s1",
        "refactoring_type": "split",
        "affected_files": ["big.md"],
        "actions": [{
            "action_type": "split",
            "target_file": "big.md",
            "details": {
                "destination_file": "part2.md",
                "sections": ["Appendix"],
                "content": "# Appendix\n..."
            }
        }]
    }));

    let ops = extract_operations(&s);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].operation_type(), OperationType::Split);
    assert_eq!(ops[0].target_file, "big.md");
    assert_eq!(ops[0].status, OperationStatus::Pending);
    match &ops[0].parameters {
        OperationParameters::Split {
            destination_file,
            sections,
            content,
        } => {
            assert_eq!(destination_file, "part2.md");
            assert_eq!(sections, &vec!["Appendix".to_string()]);
            assert_eq!(content.as_deref(), Some("# Appendix\n..."));
        }
        other => panic!("unexpected parameters: {:?}", other),
    }
}

#[test]
fn test_split_create_action_targets_original() {
    let s = suggestion(json!({
        "refactoring_type": "split",
        "affected_files": ["big.md"],
        "actions": [{
            "action_type": "create",
            "target_file": "",
            "details": {"destination_file": "extra.md", "sections": ["Extra"]}
        }]
    }));

    let ops = extract_operations(&s);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].target_file, "big.md");
}

#[test]
fn test_extraction_is_deterministic() {
    let s = suggestion(json!({
        "suggestion_id": "s2",
        "refactoring_type": "reorganization",
        "actions": [
            {"action_type": "create_category", "target_file": "archive"},
            {"action_type": "move", "target_file": "old.md", "details": {"destination_file": "archive/"}},
            {"action_type": "rename", "target_file": "a.md", "details": {"new_name": "b.md"}}
        ]
    }));

    let first = extract_operations(&s);
    let second = extract_operations(&s);
    assert_eq!(first, second);
    assert_eq!(first[0].operation_id, "s2-op-0");
    assert_eq!(first[2].operation_id, "s2-op-2");
}

// ========== CONSOLIDATION TESTS ==========

#[test]
fn test_consolidation_extraction() {
    let s = suggestion(json!({
        "refactoring_type": "consolidation",
        "affected_files": ["a.md", "b.md"],
        "actions": [
            {"action_type": "consolidate", "target_file": "a.md",
             "details": {"destination_file": "merged.md", "sections": ["Setup", "Usage"]}},
            {"action_type": "consolidate", "target_file": "b.md",
             "details": {"destination_file": "merged.md", "sections": ["Usage", "FAQ"]}}
        ]
    }));

    let ops = extract_operations(&s);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].target_file, "merged.md");
    match &ops[0].parameters {
        OperationParameters::Consolidate {
            source_files,
            sections,
            content,
        } => {
            assert_eq!(source_files, &vec!["a.md".to_string(), "b.md".to_string()]);
            assert_eq!(
                sections,
                &vec!["Setup".to_string(), "Usage".to_string(), "FAQ".to_string()]
            );
            assert!(content.is_none());
        }
        other => panic!("unexpected parameters: {:?}", other),
    }
}

#[test]
fn test_consolidation_without_destination_yields_nothing() {
    let s = suggestion(json!({
        "refactoring_type": "consolidation",
        "affected_files": ["a.md", "b.md"],
        "actions": [{"action_type": "consolidate", "target_file": "a.md"}]
    }));

    assert!(extract_operations(&s).is_empty());
}

// ========== REORGANIZATION TESTS ==========

#[test]
fn test_reorganization_skips_incomplete_actions() {
    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [
            {"action_type": "move", "target_file": "a.md"},
            {"action_type": "rename", "target_file": "b.md"},
            {"action_type": "move", "target_file": "c.md", "details": {"destination_file": "docs/c.md"}},
            {"action_type": "teleport", "target_file": "d.md"}
        ]
    }));

    let ops = extract_operations(&s);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].target_file, "c.md");
    assert_eq!(
        ops[0].parameters,
        OperationParameters::Move {
            destination_file: "docs/c.md".to_string()
        }
    );
}

#[test]
fn test_reorganization_create_category_and_delete() {
    let s = suggestion(json!({
        "refactoring_type": "reorganization",
        "actions": [
            {"action_type": "create_category", "target_file": "guides/"},
            {"action_type": "delete", "target_file": "drafts/"},
            {"action_type": "modify", "target_file": "index.md", "details": {"content": "# Index\n"}}
        ]
    }));

    let ops = extract_operations(&s);
    assert_eq!(ops.len(), 3);
    assert_eq!(ops[0].target_file, "guides");
    assert_eq!(
        ops[0].parameters,
        OperationParameters::Create {
            content: None,
            is_directory: true
        }
    );
    assert_eq!(ops[1].target_file, "drafts");
    assert_eq!(ops[1].parameters, OperationParameters::Delete { is_directory: true });
    assert_eq!(ops[2].operation_type(), OperationType::Modify);
}

// ========== LEGACY SHAPE TESTS ==========

#[test]
fn test_legacy_suggestion_extracts_same_operations() {
    let legacy = suggestion(json!({
        "id": "legacy-1",
        "type": "split",
        "files": ["big.md"],
        "actions": [{
            "action": "split",
            "file": "big.md",
            "destination": "part2.md",
            "sections": "Appendix",
            "content": "# Appendix\n..."
        }]
    }));
    let typed = suggestion(json!({
        "suggestion_id": "legacy-1",
        "refactoring_type": "split",
        "affected_files": ["big.md"],
        "actions": [{
            "action_type": "split",
            "target_file": "big.md",
            "details": {
                "destination_file": "part2.md",
                "sections": ["Appendix"],
                "content": "# Appendix\n..."
            }
        }]
    }));

    assert_eq!(legacy.refactoring_type, RefactoringType::Split);
    assert_eq!(extract_operations(&legacy), extract_operations(&typed));
}

#[test]
fn test_missing_suggestion_id_is_generated() {
    let s = suggestion(json!({"refactoring_type": "split"}));
    assert!(s.suggestion_id.starts_with("suggestion-"));
}
