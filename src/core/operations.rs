//! Operation executor.
//!
//! Applies a single refactoring operation to the memory bank:
//! - consolidate: merge sections into a new file, leave transclusions behind
//! - split: move sections of a file into a new file
//! - move / rename: relocate a file
//! - create / delete / modify: plain file and directory changes

use crate::core::bank::MemoryBank;
use crate::models::operation::{OperationParameters, RefactoringOperation};
use crate::services::sections::{
    find_section, parse_sections, remove_sections, replace_section_bodies, section_body,
    section_text,
};
use crate::utils::fs::{list_files_under, normalize_relative};
use crate::{Error, Result};
use std::sync::Arc;

/// Outcome of one applied operation, used for impact and rollback bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedChange {
    /// Existing files whose content changed.
    pub modified: Vec<String>,
    /// Paths that did not exist before and were created.
    pub created: Vec<String>,
    /// Paths that existed before and were removed.
    pub removed: Vec<String>,
}

/// Applies operations to a memory bank.
pub struct OperationExecutor {
    bank: Arc<MemoryBank>,
}

impl OperationExecutor {
    pub fn new(bank: Arc<MemoryBank>) -> Self {
        Self { bank }
    }

    /// Apply one operation.
    pub async fn execute(&self, op: &RefactoringOperation) -> Result<AppliedChange> {
        let target = normalize_relative(&op.target_file)?;
        match &op.parameters {
            OperationParameters::Consolidate {
                source_files,
                sections,
                content,
            } => {
                self.consolidate(&target, source_files, sections, content.as_deref())
                    .await
            }
            OperationParameters::Split {
                destination_file,
                sections,
                content,
            } => {
                self.split(&target, destination_file, sections, content.as_deref())
                    .await
            }
            OperationParameters::Move { destination_file } => {
                let destination = move_destination(&target, destination_file)?;
                self.relocate(&target, &destination).await
            }
            OperationParameters::Rename { new_name } => {
                let destination = rename_destination(&target, new_name)?;
                self.relocate(&target, &destination).await
            }
            OperationParameters::Create {
                content,
                is_directory,
            } => self.create(&target, content.as_deref(), *is_directory).await,
            OperationParameters::Delete { is_directory } => {
                self.delete(&target, *is_directory).await
            }
            OperationParameters::Modify { content } => self.modify(&target, content).await,
        }
    }

    /// Write the merged file, then replace each source's copy of the merged
    /// sections with a transclusion.
    async fn consolidate(
        &self,
        target: &str,
        source_files: &[String],
        sections: &[String],
        content: Option<&str>,
    ) -> Result<AppliedChange> {
        let files = self.bank.files();
        let mut change = AppliedChange::default();

        let mut sources = Vec::with_capacity(source_files.len());
        for source in source_files {
            let source = normalize_relative(source)?;
            let (text, hash) = files.read_file(&source).await?;
            sources.push((source, text, hash));
        }

        let body = match content {
            Some(literal) => literal.to_string(),
            None => merged_sections(target, &sources, sections),
        };

        let existed = files.exists(target).await;
        let expected = files.current_hash(target).await?;
        let parents = self.missing_parents(target).await;
        self.bank
            .write_document(target, &body, expected.as_deref())
            .await?;
        if existed {
            change.modified.push(target.to_string());
        } else {
            change.created.extend(parents);
            change.created.push(target.to_string());
        }

        for (source, text, hash) in &sources {
            let (rewritten, replaced) = replace_section_bodies(text, sections, |section| {
                transclusion(target, &section.heading)
            });
            if replaced.is_empty() {
                tracing::debug!("No consolidated sections found in {}", source);
                continue;
            }
            self.bank
                .write_document(source, &rewritten, Some(hash))
                .await?;
            tracing::debug!("Replaced {} section(s) in {}", replaced.len(), source);
            change.modified.push(source.clone());
        }

        Ok(change)
    }

    /// Write the new file, then remove the moved sections from the original.
    async fn split(
        &self,
        target: &str,
        destination: &str,
        sections: &[String],
        content: Option<&str>,
    ) -> Result<AppliedChange> {
        let files = self.bank.files();
        let destination = normalize_relative(destination)?;
        let mut change = AppliedChange::default();

        let (original, original_hash) = files.read_file(target).await?;
        let (remaining, removed) = remove_sections(&original, sections);

        let new_content = match content {
            Some(literal) => literal.to_string(),
            None => extracted_sections(&original, sections),
        };

        let existed = files.exists(&destination).await;
        let expected = files.current_hash(&destination).await?;
        let parents = self.missing_parents(&destination).await;
        self.bank
            .write_document(&destination, &new_content, expected.as_deref())
            .await?;
        if existed {
            change.modified.push(destination.clone());
        } else {
            change.created.extend(parents);
            change.created.push(destination.clone());
        }

        if removed.is_empty() {
            tracing::warn!("None of the split sections were found in {}", target);
        } else {
            self.bank
                .write_document(target, &remaining, Some(&original_hash))
                .await?;
            change.modified.push(target.to_string());
        }

        Ok(change)
    }

    /// Move or rename a file or directory. A missing source is a no-op.
    async fn relocate(&self, from: &str, to: &str) -> Result<AppliedChange> {
        let files = self.bank.files();
        if !files.exists(from).await {
            tracing::warn!("Source not found, skipping: {}", from);
            return Ok(AppliedChange::default());
        }
        if files.exists(to).await {
            return Err(Error::ExecuteError(format!("Destination already exists: {}", to)));
        }

        let moved_files: Vec<String> = if files.is_dir(from).await {
            let root = self.bank.root();
            list_files_under(root, &files.resolve(from)?)
        } else {
            vec![from.to_string()]
        };

        let mut change = AppliedChange {
            created: self.missing_parents(to).await,
            ..AppliedChange::default()
        };
        files.rename(from, to).await?;

        for old in moved_files {
            let new = format!("{}{}", to, &old[from.len()..]);
            self.bank.record_moved(&old, &new).await?;
            change.removed.push(old);
            change.created.push(new);
        }
        Ok(change)
    }

    async fn create(
        &self,
        target: &str,
        content: Option<&str>,
        is_directory: bool,
    ) -> Result<AppliedChange> {
        let files = self.bank.files();
        if files.exists(target).await {
            return Err(Error::ExecuteError(format!("Already exists: {}", target)));
        }

        let mut created = self.missing_parents(target).await;
        if is_directory {
            files.create_dir_all(target).await?;
        } else {
            self.bank
                .write_document(target, content.unwrap_or_default(), None)
                .await?;
        }
        created.push(target.to_string());

        Ok(AppliedChange {
            created,
            ..AppliedChange::default()
        })
    }

    /// Ancestor directories of `path` that do not exist yet, outermost first.
    async fn missing_parents(&self, path: &str) -> Vec<String> {
        let files = self.bank.files();
        let mut missing = Vec::new();
        let mut current = path;
        while let Some((parent, _)) = current.rsplit_once('/') {
            if parent.is_empty() || files.exists(parent).await {
                break;
            }
            missing.push(parent.to_string());
            current = parent;
        }
        missing.reverse();
        missing
    }

    async fn delete(&self, target: &str, is_directory: bool) -> Result<AppliedChange> {
        let files = self.bank.files();
        if !files.exists(target).await {
            return Err(Error::PathNotFound(target.to_string()));
        }

        if is_directory || files.is_dir(target).await {
            let removed = list_files_under(self.bank.root(), &files.resolve(target)?);
            files.remove_dir_all(target).await?;
            self.bank.record_removed(&removed).await?;
            Ok(AppliedChange {
                removed,
                ..AppliedChange::default()
            })
        } else {
            self.bank.remove_document(target).await?;
            Ok(AppliedChange {
                removed: vec![target.to_string()],
                ..AppliedChange::default()
            })
        }
    }

    async fn modify(&self, target: &str, content: &str) -> Result<AppliedChange> {
        let (_, hash) = self.bank.files().read_file(target).await?;
        self.bank.write_document(target, content, Some(&hash)).await?;
        Ok(AppliedChange {
            modified: vec![target.to_string()],
            ..AppliedChange::default()
        })
    }
}

/// Transclusion placeholder pointing at a section of another file.
pub fn transclusion(file: &str, section: &str) -> String {
    format!("{{{{include: {}#{}}}}}", file, section)
}

/// Destination of a move. A trailing `/` means "into this directory".
pub fn move_destination(target: &str, destination: &str) -> Result<String> {
    if destination.ends_with('/') {
        let file_name = target.rsplit('/').next().unwrap_or(target);
        normalize_relative(&format!("{}{}", destination, file_name))
    } else {
        normalize_relative(destination)
    }
}

/// Destination of a rename: `new_name` next to `target`.
pub fn rename_destination(target: &str, new_name: &str) -> Result<String> {
    match target.rsplit_once('/') {
        Some((dir, _)) => normalize_relative(&format!("{}/{}", dir, new_name)),
        None => normalize_relative(new_name),
    }
}

/// Build the consolidated file from the first occurrence of each section.
fn merged_sections(target: &str, sources: &[(String, String, String)], sections: &[String]) -> String {
    let mut out = format!("# {}\n", document_title(target));

    for name in sections {
        let found = sources.iter().find_map(|(source, text, _)| {
            let parsed = parse_sections(text);
            find_section(&parsed, name).map(|section| (source, section.heading.clone(), section_body(text, section)))
        });
        match found {
            Some((source, heading, body)) => {
                tracing::debug!("Consolidating '{}' from {}", heading, source);
                out.push_str(&format!("\n## {}\n\n{}\n", heading, body));
            }
            None => tracing::warn!("Section '{}' not found in any source file", name),
        }
    }
    out
}

/// Text of the named sections, in document order.
fn extracted_sections(original: &str, names: &[String]) -> String {
    let parsed = parse_sections(original);
    let mut blocks: Vec<String> = Vec::new();
    let mut covered_until = 0;

    let mut matched: Vec<_> = names
        .iter()
        .filter_map(|name| find_section(&parsed, name))
        .collect();
    matched.sort_by_key(|s| s.line_start);

    for section in matched {
        if section.line_start < covered_until {
            continue;
        }
        blocks.push(section_text(original, section).trim_end().to_string());
        covered_until = section.line_end;
    }

    let mut out = blocks.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Title for a generated document, from its file stem.
fn document_title(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    let stem = file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file);
    stem.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transclusion() {
        assert_eq!(
            transclusion("merged.md", "Setup"),
            "{{include: merged.md#Setup}}"
        );
    }

    #[test]
    fn test_destinations() {
        assert_eq!(move_destination("a.md", "archive/").unwrap(), "archive/a.md");
        assert_eq!(move_destination("a.md", "archive/b.md").unwrap(), "archive/b.md");
        assert_eq!(rename_destination("notes/a.md", "b.md").unwrap(), "notes/b.md");
        assert_eq!(rename_destination("a.md", "b.md").unwrap(), "b.md");
    }

    #[test]
    fn test_document_title() {
        assert_eq!(document_title("notes/shared-setup_guide.md"), "Shared Setup Guide");
        assert_eq!(document_title("merged.md"), "Merged");
    }

    #[test]
    fn test_extracted_sections() {
        let doc = "# Doc\n\n## A\n\na\n\n## B\n\nb\n";
        let out = extracted_sections(doc, &["B".to_string(), "A".to_string()]);
        assert_eq!(out, "## A\n\na\n\n## B\n\nb\n");
    }
}
