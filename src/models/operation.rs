//! Refactoring operation data model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One atomic, typed file mutation derived from a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactoringOperation {
    /// Operation ID (deterministic per suggestion).
    pub operation_id: String,
    /// Primary file of the operation, relative to the project root.
    pub target_file: String,
    /// Type-specific parameters.
    pub parameters: OperationParameters,
    /// Execution status.
    pub status: OperationStatus,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RefactoringOperation {
    /// Create a pending operation.
    pub fn new(
        operation_id: impl Into<String>,
        target_file: impl Into<String>,
        parameters: OperationParameters,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            target_file: target_file.into(),
            parameters,
            status: OperationStatus::Pending,
            error: None,
        }
    }

    /// Operation type, derived from the parameters.
    pub fn operation_type(&self) -> OperationType {
        self.parameters.operation_type()
    }
}

/// Operation parameters, one variant per operation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationParameters {
    /// Merge sections of several files into `target_file`.
    Consolidate {
        source_files: Vec<String>,
        sections: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    /// Move sections of `target_file` into a new file.
    ///
    /// Without literal `content` the new file receives the removed sections.
    Split {
        destination_file: String,
        sections: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    /// Move `target_file` to another path.
    Move { destination_file: String },
    /// Rename `target_file` within its directory.
    Rename { new_name: String },
    /// Create a file or directory at `target_file`.
    Create {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default)]
        is_directory: bool,
    },
    /// Delete the file or directory at `target_file`.
    Delete {
        #[serde(default)]
        is_directory: bool,
    },
    /// Overwrite `target_file`.
    Modify { content: String },
}

impl OperationParameters {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Consolidate { .. } => OperationType::Consolidate,
            Self::Split { .. } => OperationType::Split,
            Self::Move { .. } => OperationType::Move,
            Self::Rename { .. } => OperationType::Rename,
            Self::Create { .. } => OperationType::Create,
            Self::Delete { .. } => OperationType::Delete,
            Self::Modify { .. } => OperationType::Modify,
        }
    }
}

/// Operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Consolidate,
    Split,
    Move,
    Rename,
    Create,
    Delete,
    Modify,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Consolidate => "consolidate",
            Self::Split => "split",
            Self::Move => "move",
            Self::Rename => "rename",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Modify => "modify",
        };
        f.write_str(name)
    }
}

/// Operation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_derived_from_parameters() {
        let op = RefactoringOperation::new(
            "s-op-0",
            "big.md",
            OperationParameters::Split {
                destination_file: "part2.md".to_string(),
                sections: vec!["Appendix".to_string()],
                content: None,
            },
        );
        assert_eq!(op.operation_type(), OperationType::Split);
        assert_eq!(op.status, OperationStatus::Pending);
        assert_eq!(op.operation_type().to_string(), "split");
    }

    #[test]
    fn test_parameters_serialization_is_tagged() {
        let params = OperationParameters::Delete { is_directory: true };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["type"], "delete");
        assert_eq!(json["is_directory"], true);

        let back: OperationParameters = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }
}
