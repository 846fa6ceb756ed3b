//! Execution validator.
//!
//! Read-only precondition checks for a batch of operations. Issues block
//! execution; warnings are informational. Operations are checked in order
//! against a simulated view of the tree, so an operation may depend on a path
//! an earlier one creates.

use crate::core::bank::MemoryBank;
use crate::core::extractor::extract_operations;
use crate::core::operations::{move_destination, rename_destination};
use crate::models::execution::ValidationResult;
use crate::models::operation::{OperationParameters, RefactoringOperation};
use crate::models::suggestion::RefactoringSuggestion;
use crate::utils::fs::normalize_relative;
use std::collections::HashSet;
use std::sync::Arc;

/// Validates refactoring batches against the current state of a memory bank.
pub struct ExecutionValidator {
    bank: Arc<MemoryBank>,
}

impl ExecutionValidator {
    pub fn new(bank: Arc<MemoryBank>) -> Self {
        Self { bank }
    }

    /// Validate a suggestion.
    ///
    /// Inbound-link scanning is skipped for dry runs.
    pub async fn validate(&self, suggestion: &RefactoringSuggestion, dry_run: bool) -> ValidationResult {
        let operations = extract_operations(suggestion);
        self.validate_operations(suggestion, &operations, dry_run).await
    }

    /// Validate already-extracted operations.
    pub async fn validate_operations(
        &self,
        suggestion: &RefactoringSuggestion,
        operations: &[RefactoringOperation],
        dry_run: bool,
    ) -> ValidationResult {
        let mut result = ValidationResult {
            valid: false,
            issues: Vec::new(),
            warnings: Vec::new(),
            operations_count: operations.len(),
        };

        if operations.is_empty() {
            result
                .issues
                .push("Suggestion produced no executable operations".to_string());
        }

        let mut tree = PlannedTree::default();
        let mut touched: Vec<String> = Vec::new();
        let mut link_targets: Vec<String> = Vec::new();

        for op in operations {
            let target = match normalize_relative(&op.target_file) {
                Ok(target) if !target.is_empty() => target,
                _ => {
                    result.issues.push(format!(
                        "Invalid target path for {} operation: {}",
                        op.operation_type(),
                        op.target_file
                    ));
                    continue;
                }
            };

            match &op.parameters {
                OperationParameters::Consolidate { source_files, .. } => {
                    if source_files.is_empty() {
                        result
                            .issues
                            .push(format!("Consolidation into {} has no source files", target));
                    }
                    for source in source_files {
                        let found = match normalize_relative(source) {
                            Ok(normalized) if !normalized.is_empty() => {
                                let exists = self.exists(&tree, &normalized).await;
                                if exists {
                                    touched.push(normalized);
                                }
                                exists
                            }
                            _ => false,
                        };
                        if !found {
                            result
                                .issues
                                .push(format!("Source file not found: {}", source));
                        }
                    }
                    if self.exists(&tree, &target).await {
                        result
                            .warnings
                            .push(format!("{} already exists and will be overwritten", target));
                        touched.push(target.clone());
                    }
                    tree.create(&target);
                }
                OperationParameters::Split {
                    destination_file,
                    sections,
                    content,
                } => {
                    if !self.exists(&tree, &target).await {
                        result.issues.push(format!("Target file not found: {}", target));
                    } else {
                        touched.push(target.clone());
                    }
                    if sections.is_empty() && content.is_none() {
                        result
                            .issues
                            .push(format!("Split of {} names no sections and no content", target));
                    }
                    match normalize_relative(destination_file) {
                        Ok(destination) => {
                            if self.exists(&tree, &destination).await {
                                result
                                    .issues
                                    .push(format!("Destination already exists: {}", destination));
                            }
                            tree.create(&destination);
                        }
                        Err(e) => result.issues.push(e.to_string()),
                    }
                }
                OperationParameters::Move { destination_file } => {
                    let destination = move_destination(&target, destination_file);
                    self.check_relocation(&mut tree, &mut result, &target, destination)
                        .await;
                    touched.push(target.clone());
                    link_targets.push(target.clone());
                }
                OperationParameters::Rename { new_name } => {
                    let destination = rename_destination(&target, new_name);
                    self.check_relocation(&mut tree, &mut result, &target, destination)
                        .await;
                    touched.push(target.clone());
                    link_targets.push(target.clone());
                }
                OperationParameters::Create { .. } => {
                    if self.exists(&tree, &target).await {
                        result.issues.push(format!("Target already exists: {}", target));
                    }
                    tree.create(&target);
                }
                OperationParameters::Delete { .. } => {
                    if !self.exists(&tree, &target).await {
                        result.issues.push(format!("Target file not found: {}", target));
                    } else {
                        touched.push(target.clone());
                        link_targets.push(target.clone());
                    }
                    tree.remove(&target);
                }
                OperationParameters::Modify { .. } => {
                    if !self.exists(&tree, &target).await {
                        result.issues.push(format!("Target file not found: {}", target));
                    } else {
                        touched.push(target.clone());
                    }
                }
            }
        }

        self.warn_tracked_files(&touched, &mut result).await;

        if !dry_run {
            self.warn_inbound_links(&link_targets, &touched, &mut result).await;
        }

        let threshold = self.bank.config().token_regression_threshold;
        let impact = &suggestion.estimated_impact;
        if impact.token_savings < -threshold {
            result.warnings.push(format!(
                "Estimated token usage increases by {} (threshold {})",
                -impact.token_savings,
                threshold
            ));
        }
        if impact.complexity_reduction < 0.0 {
            result.warnings.push(format!(
                "Estimated complexity increases by {:.2}",
                -impact.complexity_reduction
            ));
        }

        result.valid = result.issues.is_empty();
        tracing::debug!(
            "Validated {} operation(s): {} issue(s), {} warning(s)",
            result.operations_count,
            result.issues.len(),
            result.warnings.len()
        );
        result
    }

    async fn check_relocation(
        &self,
        tree: &mut PlannedTree,
        result: &mut ValidationResult,
        target: &str,
        destination: crate::Result<String>,
    ) {
        if !self.exists(tree, target).await {
            result.issues.push(format!("Target file not found: {}", target));
        }
        match destination {
            Ok(destination) => {
                if self.exists(tree, &destination).await {
                    result
                        .issues
                        .push(format!("Destination already exists: {}", destination));
                }
                tree.remove(target);
                tree.create(&destination);
            }
            Err(e) => result.issues.push(e.to_string()),
        }
    }

    /// Touched files that already have tracked metadata. A hash mismatch
    /// confirms an edit made outside the memory bank.
    async fn warn_tracked_files(&self, touched: &[String], result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for file in touched {
            if !seen.insert(file.as_str()) {
                continue;
            }
            let Some(meta) = self.bank.file_metadata(file).await else {
                continue;
            };
            if meta.deleted_at.is_some() {
                continue;
            }
            match self.bank.files().current_hash(file).await {
                Ok(Some(hash)) if hash != meta.content_hash => result.warnings.push(format!(
                    "{} has changes not recorded by the memory bank (possible uncommitted external edit)",
                    file
                )),
                Ok(Some(_)) => result.warnings.push(format!(
                    "{} already has tracked metadata (possible uncommitted external change)",
                    file
                )),
                Ok(None) => {}
                Err(e) => result.issues.push(format!("Failed to read {}: {}", file, e)),
            }
        }
    }

    /// Documents that mention a file about to be deleted, moved or renamed.
    async fn warn_inbound_links(
        &self,
        link_targets: &[String],
        touched: &[String],
        result: &mut ValidationResult,
    ) {
        if link_targets.is_empty() {
            return;
        }

        for document in self.bank.list_documents() {
            if touched.contains(&document) {
                continue;
            }
            let content = match self.bank.files().read_file(&document).await {
                Ok((content, _)) => content,
                Err(e) => {
                    tracing::warn!("Skipping link scan of {}: {}", document, e);
                    continue;
                }
            };
            for target in link_targets {
                if mentions(&content, target) {
                    result.warnings.push(format!(
                        "{} may have links to {} that need updating",
                        document, target
                    ));
                }
            }
        }
    }

    async fn exists(&self, tree: &PlannedTree, path: &str) -> bool {
        if tree.created.contains(path) {
            return true;
        }
        if tree.removed.iter().any(|r| path == r.as_str() || path.starts_with(&format!("{}/", r))) {
            return false;
        }
        self.bank.files().exists(path).await
    }
}

/// Paths created or removed by earlier operations in the batch.
#[derive(Default)]
struct PlannedTree {
    created: HashSet<String>,
    removed: HashSet<String>,
}

impl PlannedTree {
    fn create(&mut self, path: &str) {
        self.removed.remove(path);
        self.created.insert(path.to_string());
    }

    fn remove(&mut self, path: &str) {
        self.created.remove(path);
        self.removed.insert(path.to_string());
    }
}

/// Whether `content` references `target` by file name or wiki-link stem.
fn mentions(content: &str, target: &str) -> bool {
    let file_name = target.rsplit('/').next().unwrap_or(target);
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    content.contains(file_name) || (!stem.is_empty() && content.contains(&format!("[[{}]]", stem)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions() {
        assert!(mentions("See [setup](notes/setup.md).", "notes/setup.md"));
        assert!(mentions("See [[setup]].", "notes/setup.md"));
        assert!(!mentions("Nothing to see here.", "notes/setup.md"));
    }

    #[test]
    fn test_planned_tree() {
        let mut tree = PlannedTree::default();
        tree.create("a.md");
        tree.remove("a.md");
        assert!(!tree.created.contains("a.md"));
        assert!(tree.removed.contains("a.md"));
        tree.create("a.md");
        assert!(!tree.removed.contains("a.md"));
    }
}
