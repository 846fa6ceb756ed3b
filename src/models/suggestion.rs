//! Refactoring suggestion data model.
//!
//! Suggestions are produced by external recommenders. Two wire shapes are
//! accepted: the typed shape below, and an older untyped map which is converted
//! by [`from_legacy`] before anything else sees it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A proposed structural change to the memory bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactoringSuggestion {
    /// Suggestion ID (generated at the boundary if the producer omitted it).
    #[serde(default)]
    pub suggestion_id: String,
    /// Kind of restructuring.
    pub refactoring_type: RefactoringType,
    /// Files the suggestion touches.
    #[serde(default)]
    pub affected_files: Vec<String>,
    /// Concrete actions.
    #[serde(default)]
    pub actions: Vec<RefactoringAction>,
    /// Recommender's estimate of the effect.
    #[serde(default)]
    pub estimated_impact: EstimatedImpact,
}

/// Suggestion kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefactoringType {
    #[serde(alias = "consolidate")]
    Consolidation,
    #[serde(alias = "splitting")]
    Split,
    #[serde(alias = "reorganize", alias = "reorganisation")]
    Reorganization,
}

impl RefactoringType {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "consolidation" | "consolidate" => Some(Self::Consolidation),
            "split" | "splitting" => Some(Self::Split),
            "reorganization" | "reorganize" | "reorganisation" => Some(Self::Reorganization),
            _ => None,
        }
    }
}

/// One action inside a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactoringAction {
    /// Action kind.
    pub action_type: ActionType,
    /// File the action applies to.
    #[serde(default)]
    pub target_file: String,
    /// Action parameters.
    #[serde(default)]
    pub details: ActionDetails,
}

/// Action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Consolidate,
    Split,
    Create,
    Move,
    Rename,
    CreateCategory,
    Delete,
    Modify,
    #[serde(other)]
    Unknown,
}

impl ActionType {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "consolidate" | "merge" => Self::Consolidate,
            "split" => Self::Split,
            "create" | "create_file" => Self::Create,
            "move" => Self::Move,
            "rename" => Self::Rename,
            "create_category" | "mkdir" => Self::CreateCategory,
            "delete" | "remove" => Self::Delete,
            "modify" | "update" => Self::Modify,
            _ => Self::Unknown,
        }
    }
}

/// Action parameters; each action kind reads the fields it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
}

/// Estimated effect of a suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimatedImpact {
    /// Tokens saved (negative for a regression).
    #[serde(default)]
    pub token_savings: i64,
    /// Complexity reduction (negative for an increase).
    #[serde(default)]
    pub complexity_reduction: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,
}

/// Risk level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" | "moderate" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Parse a suggestion in either wire shape and assign an ID if it has none.
pub fn parse_suggestion(value: Value) -> crate::Result<RefactoringSuggestion> {
    let mut suggestion = match serde_json::from_value::<RefactoringSuggestion>(value.clone()) {
        Ok(typed) => typed,
        Err(e) => {
            tracing::debug!("Not a typed suggestion ({}), trying legacy shape", e);
            from_legacy(&value)?
        }
    };

    if suggestion.suggestion_id.trim().is_empty() {
        suggestion.suggestion_id = format!("suggestion-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    }
    Ok(suggestion)
}

/// Convert the legacy untyped map into a typed suggestion.
///
/// Legacy producers used short keys (`type`, `files`, `target`, `destination`)
/// and put action parameters either in a `details` object or inline.
pub fn from_legacy(value: &Value) -> crate::Result<RefactoringSuggestion> {
    let map = value
        .as_object()
        .ok_or_else(|| crate::Error::InvalidSuggestion("expected a JSON object".to_string()))?;

    let raw_type = first_str(map, &["refactoring_type", "type", "suggestion_type"])
        .ok_or_else(|| crate::Error::InvalidSuggestion("missing refactoring type".to_string()))?;
    let refactoring_type = RefactoringType::parse(raw_type).ok_or_else(|| {
        crate::Error::InvalidSuggestion(format!("unknown refactoring type: {}", raw_type))
    })?;

    let suggestion_id = first_str(map, &["suggestion_id", "id"])
        .unwrap_or_default()
        .to_string();
    let affected_files = string_list(first_value(map, &["affected_files", "files", "file"]));

    let actions = first_value(map, &["actions", "steps"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(legacy_action).collect())
        .unwrap_or_default();

    let estimated_impact = first_value(map, &["estimated_impact", "impact"])
        .and_then(Value::as_object)
        .map(|impact| EstimatedImpact {
            token_savings: number(impact.get("token_savings")).round() as i64,
            complexity_reduction: number(impact.get("complexity_reduction")),
            risk_level: impact
                .get("risk_level")
                .and_then(Value::as_str)
                .map(RiskLevel::parse)
                .unwrap_or_default(),
        })
        .unwrap_or_default();

    Ok(RefactoringSuggestion {
        suggestion_id,
        refactoring_type,
        affected_files,
        actions,
        estimated_impact,
    })
}

fn legacy_action(value: &Value) -> Option<RefactoringAction> {
    let map = value.as_object()?;
    let action_type = ActionType::parse(first_str(map, &["action_type", "action", "type"])?);
    let target_file = first_str(map, &["target_file", "file", "target", "source"])
        .unwrap_or_default()
        .to_string();

    // Parameters may be nested or inline; nested wins.
    let nested = map.get("details").and_then(Value::as_object);
    let lookup = |keys: &[&str]| -> Option<&Value> {
        nested
            .and_then(|d| first_value(d, keys))
            .or_else(|| first_value(map, keys))
    };

    let details = ActionDetails {
        destination_file: lookup(&["destination_file", "destination", "new_file", "to"])
            .and_then(Value::as_str)
            .map(String::from),
        sections: string_list(lookup(&["sections", "section"])),
        content: lookup(&["content"]).and_then(Value::as_str).map(String::from),
        new_name: lookup(&["new_name", "name"]).and_then(Value::as_str).map(String::from),
    };

    Some(RefactoringAction {
        action_type,
        target_file,
        details,
    })
}

fn first_value<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k)).filter(|v| !v.is_null())
}

fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    first_value(map, keys).and_then(Value::as_str)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_typed_suggestion() {
        let value = json!({
            "suggestion_id": "s1",
            "refactoring_type": "split",
            "affected_files": ["big.md"],
            "actions": [{
                "action_type": "split",
                "target_file": "big.md",
                "details": {"destination_file": "part2.md", "sections": ["Appendix"]}
            }],
            "estimated_impact": {"token_savings": 120, "complexity_reduction": 0.2, "risk_level": "medium"}
        });

        let suggestion = parse_suggestion(value).unwrap();
        assert_eq!(suggestion.suggestion_id, "s1");
        assert_eq!(suggestion.refactoring_type, RefactoringType::Split);
        assert_eq!(suggestion.actions[0].action_type, ActionType::Split);
        assert_eq!(suggestion.estimated_impact.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_parse_legacy_suggestion() {
        let value = json!({
            "id": "legacy-1",
            "type": "reorganize",
            "files": "notes.md",
            "actions": [
                {"action": "move", "target": "notes.md", "destination": "archive/notes.md"},
                {"type": "rename", "file": "todo.md", "details": {"new_name": "tasks.md"}}
            ],
            "impact": {"token_savings": "40", "risk_level": "HIGH"}
        });

        let suggestion = parse_suggestion(value).unwrap();
        assert_eq!(suggestion.suggestion_id, "legacy-1");
        assert_eq!(suggestion.refactoring_type, RefactoringType::Reorganization);
        assert_eq!(suggestion.affected_files, vec!["notes.md".to_string()]);
        assert_eq!(suggestion.actions.len(), 2);
        assert_eq!(
            suggestion.actions[0].details.destination_file.as_deref(),
            Some("archive/notes.md")
        );
        assert_eq!(suggestion.actions[1].action_type, ActionType::Rename);
        assert_eq!(suggestion.actions[1].details.new_name.as_deref(), Some("tasks.md"));
        assert_eq!(suggestion.estimated_impact.token_savings, 40);
        assert_eq!(suggestion.estimated_impact.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_parse_assigns_missing_id() {
        let value = json!({"refactoring_type": "consolidation"});
        let suggestion = parse_suggestion(value).unwrap();
        assert!(suggestion.suggestion_id.starts_with("suggestion-"));
    }

    #[test]
    fn test_legacy_rejects_unknown_type() {
        let value = json!({"type": "explode"});
        assert!(from_legacy(&value).is_err());
        assert!(parse_suggestion(json!([1, 2])).is_err());
    }

    #[test]
    fn test_unknown_action_type() {
        let action: RefactoringAction =
            serde_json::from_value(json!({"action_type": "teleport", "target_file": "a.md"}))
                .unwrap();
        assert_eq!(action.action_type, ActionType::Unknown);
    }
}
