//! Snapshot version data model.

use serde::{Deserialize, Serialize};

/// Marker written into the description of every pre-refactoring snapshot.
pub const PRE_REFACTORING_MARKER: &str = "Pre-refactoring snapshot: ";

/// Marker written into the description of every pre-rollback backup.
pub const PRE_ROLLBACK_MARKER: &str = "Pre-rollback backup: ";

/// Immutable record describing one snapshot of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Version number, increasing per file.
    pub version: u32,
    /// Creation timestamp (RFC 3339).
    pub timestamp: String,
    /// Hash of the snapshot file's bytes.
    pub content_hash: String,
    /// Snapshot size.
    pub size_bytes: u64,
    /// Estimated token count.
    pub token_count: usize,
    /// Why the snapshot was taken.
    pub change_type: ChangeType,
    /// Snapshot location, relative to the project root.
    pub snapshot_path: String,
    /// Headings of sections that changed relative to the previous version.
    #[serde(default)]
    pub changed_sections: Vec<String>,
    /// Free-text description; may carry marker strings.
    #[serde(default)]
    pub change_description: String,
    /// Snapshot batch this version belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

impl VersionMetadata {
    /// Whether this version belongs to the given pre-refactoring snapshot batch.
    ///
    /// Records written without `batch_id` are matched by their description marker.
    pub fn belongs_to_batch(&self, snapshot_id: &str) -> bool {
        match self.batch_id.as_deref() {
            Some(batch) => batch == snapshot_id,
            None => parse_batch_marker(&self.change_description) == Some(snapshot_id),
        }
    }

    /// Whether this version is the pre-refactoring snapshot of any batch.
    pub fn is_batch_snapshot(&self) -> bool {
        self.batch_id.is_some() || parse_batch_marker(&self.change_description).is_some()
    }
}

/// Extract the snapshot id from a `Pre-refactoring snapshot: <id>` description.
pub fn parse_batch_marker(description: &str) -> Option<&str> {
    let start = description.find(PRE_REFACTORING_MARKER)? + PRE_REFACTORING_MARKER.len();
    description[start..].split_whitespace().next()
}

/// Snapshot change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Modified,
    Rollback,
    ManualBackup,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(description: &str, batch: Option<&str>) -> VersionMetadata {
        VersionMetadata {
            version: 1,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            content_hash: "sha256:00".to_string(),
            size_bytes: 0,
            token_count: 0,
            change_type: ChangeType::Modified,
            snapshot_path: ".membank/history/a_v1.md".to_string(),
            changed_sections: vec![],
            change_description: description.to_string(),
            batch_id: batch.map(String::from),
        }
    }

    #[test]
    fn test_parse_batch_marker() {
        assert_eq!(
            parse_batch_marker("Pre-refactoring snapshot: snapshot-123"),
            Some("snapshot-123")
        );
        assert_eq!(parse_batch_marker("Manual edit"), None);
    }

    #[test]
    fn test_belongs_to_batch_prefers_explicit_id() {
        let v = version("Pre-refactoring snapshot: snapshot-1", Some("snapshot-2"));
        assert!(v.belongs_to_batch("snapshot-2"));
        assert!(!v.belongs_to_batch("snapshot-1"));

        let legacy = version("Pre-refactoring snapshot: snapshot-1", None);
        assert!(legacy.belongs_to_batch("snapshot-1"));
        assert!(!legacy.belongs_to_batch("snapshot-10"));
    }

    #[test]
    fn test_change_type_serialization() {
        let json = serde_json::to_string(&ChangeType::ManualBackup).unwrap();
        assert_eq!(json, "\"manual_backup\"");
    }
}
