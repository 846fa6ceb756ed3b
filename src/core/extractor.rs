//! Operation extraction.
//!
//! Turns a suggestion into an ordered list of typed operations. Extraction is
//! a pure function of the suggestion: no I/O, and operation IDs are derived
//! from the suggestion ID and position.

use crate::models::operation::{OperationParameters, RefactoringOperation};
use crate::models::suggestion::{ActionType, RefactoringAction, RefactoringSuggestion, RefactoringType};

/// Extract the operations a suggestion describes.
pub fn extract_operations(suggestion: &RefactoringSuggestion) -> Vec<RefactoringOperation> {
    let mut builder = OperationBuilder::new(&suggestion.suggestion_id);

    match suggestion.refactoring_type {
        RefactoringType::Consolidation => extract_consolidation(suggestion, &mut builder),
        RefactoringType::Split => extract_split(suggestion, &mut builder),
        RefactoringType::Reorganization => extract_reorganization(suggestion, &mut builder),
    }

    builder.operations
}

/// One consolidate operation merging every affected file into the first
/// action's destination.
fn extract_consolidation(suggestion: &RefactoringSuggestion, builder: &mut OperationBuilder) {
    let Some(first) = suggestion.actions.first() else {
        tracing::debug!("Consolidation {} has no actions", suggestion.suggestion_id);
        return;
    };
    let Some(target) = non_empty(first.details.destination_file.as_deref()) else {
        tracing::debug!(
            "Consolidation {} has no destination file",
            suggestion.suggestion_id
        );
        return;
    };

    let candidates: Vec<&str> = if suggestion.affected_files.is_empty() {
        suggestion.actions.iter().map(|a| a.target_file.as_str()).collect()
    } else {
        suggestion.affected_files.iter().map(String::as_str).collect()
    };
    let source_files = ordered_union(
        candidates
            .into_iter()
            .filter(|f| !f.trim().is_empty() && *f != target),
    );
    let sections = ordered_union(
        suggestion
            .actions
            .iter()
            .flat_map(|a| a.details.sections.iter().map(String::as_str)),
    );

    builder.push(
        target,
        OperationParameters::Consolidate {
            source_files,
            sections,
            content: first.details.content.clone(),
        },
    );
}

/// One split operation per split/create action, targeting the original file.
fn extract_split(suggestion: &RefactoringSuggestion, builder: &mut OperationBuilder) {
    for action in &suggestion.actions {
        match action.action_type {
            ActionType::Split | ActionType::Create => {
                let original = non_empty(Some(action.target_file.as_str()))
                    .or_else(|| suggestion.affected_files.first().map(String::as_str));
                let (Some(original), Some(destination)) =
                    (original, non_empty(action.details.destination_file.as_deref()))
                else {
                    tracing::debug!("Skipping split action without file names: {:?}", action);
                    continue;
                };
                builder.push(
                    original,
                    OperationParameters::Split {
                        destination_file: destination.to_string(),
                        sections: action.details.sections.clone(),
                        content: action.details.content.clone(),
                    },
                );
            }
            _ => extract_common(action, builder),
        }
    }
}

/// Move, rename and category creation.
fn extract_reorganization(suggestion: &RefactoringSuggestion, builder: &mut OperationBuilder) {
    for action in &suggestion.actions {
        let target = action.target_file.trim();
        match action.action_type {
            ActionType::Move => {
                let Some(destination) = non_empty(action.details.destination_file.as_deref())
                else {
                    tracing::debug!("Skipping move without destination: {}", target);
                    continue;
                };
                if target.is_empty() {
                    continue;
                }
                builder.push(
                    target,
                    OperationParameters::Move {
                        destination_file: destination.to_string(),
                    },
                );
            }
            ActionType::Rename => {
                let new_name = non_empty(action.details.new_name.as_deref())
                    .or_else(|| non_empty(action.details.destination_file.as_deref()));
                let Some(new_name) = new_name else {
                    tracing::debug!("Skipping rename without new name: {}", target);
                    continue;
                };
                if target.is_empty() {
                    continue;
                }
                builder.push(
                    target,
                    OperationParameters::Rename {
                        new_name: new_name.to_string(),
                    },
                );
            }
            ActionType::CreateCategory => {
                let Some(directory) = non_empty(action.details.destination_file.as_deref())
                    .or_else(|| non_empty(Some(target)))
                else {
                    continue;
                };
                builder.push(
                    directory.trim_end_matches('/'),
                    OperationParameters::Create {
                        content: None,
                        is_directory: true,
                    },
                );
            }
            _ => extract_common(action, builder),
        }
    }
}

/// Actions valid in any suggestion type.
fn extract_common(action: &RefactoringAction, builder: &mut OperationBuilder) {
    let target = action.target_file.trim();
    if target.is_empty() {
        return;
    }

    match action.action_type {
        ActionType::Delete => builder.push(
            target.trim_end_matches('/'),
            OperationParameters::Delete {
                is_directory: target.ends_with('/'),
            },
        ),
        ActionType::Modify => {
            if let Some(content) = &action.details.content {
                builder.push(
                    target,
                    OperationParameters::Modify {
                        content: content.clone(),
                    },
                );
            }
        }
        ActionType::Create => builder.push(
            target,
            OperationParameters::Create {
                content: Some(action.details.content.clone().unwrap_or_default()),
                is_directory: false,
            },
        ),
        other => tracing::debug!("Ignoring {:?} action for {}", other, target),
    }
}

struct OperationBuilder {
    suggestion_id: String,
    operations: Vec<RefactoringOperation>,
}

impl OperationBuilder {
    fn new(suggestion_id: &str) -> Self {
        Self {
            suggestion_id: suggestion_id.to_string(),
            operations: Vec::new(),
        }
    }

    fn push(&mut self, target_file: &str, parameters: OperationParameters) {
        let id = format!("{}-op-{}", self.suggestion_id, self.operations.len());
        self.operations
            .push(RefactoringOperation::new(id, target_file.trim(), parameters));
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn ordered_union<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}
