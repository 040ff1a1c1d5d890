//! Request and response documents exchanged with callers.

use crate::model::SmellKind;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A submitted source file. `name` must be a bare file name; it is validated
/// before being joined to a workspace path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Per-request smell selection overrides.
///
/// Keys are kept as raw strings so that names outside the registry can be
/// ignored (or rejected) by the resolver instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    /// Individual toggles applied on top of the defaults
    #[serde(default)]
    pub enabled: Option<BTreeMap<String, bool>>,
    /// When non-empty, exactly these kinds run
    #[serde(default)]
    pub only: Option<Vec<String>>,
    /// Kinds forced off when `only` is absent or empty
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
}

/// Inbound analysis request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Missing and `null` both read as no files, rejected later as "No code provided"
    #[serde(default, deserialize_with = "null_as_empty")]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub config: Option<ConfigOverrides>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single finding reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub file: String,
    pub line_start: u32,
    pub line_end: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Findings for one smell kind. `count` always equals `items.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingGroup {
    pub count: usize,
    pub items: Vec<Finding>,
}

impl FindingGroup {
    pub fn new(items: Vec<Finding>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Outbound analysis response. `findings` keys are exactly `active_smells`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub active_smells: Vec<SmellKind>,
    pub findings: BTreeMap<SmellKind, FindingGroup>,
}

impl AnalysisResponse {
    /// Response for an empty active set.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_accepts_missing_and_null_config() {
        let req: AnalysisRequest = serde_json::from_value(json!({
            "files": [{"name": "a.py", "content": "x = 1"}]
        }))
        .unwrap();
        assert!(req.config.is_none());

        let req: AnalysisRequest = serde_json::from_value(json!({
            "files": [],
            "config": {"enabled": null, "only": ["MagicNumbers"]}
        }))
        .unwrap();
        let config = req.config.unwrap();
        assert_eq!(config.only, Some(vec!["MagicNumbers".to_string()]));
        assert!(config.enabled.is_none());
    }

    #[test]
    fn test_null_or_missing_files_read_as_empty() {
        let req: AnalysisRequest = serde_json::from_value(json!({ "files": null })).unwrap();
        assert!(req.files.is_empty());

        let req: AnalysisRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.files.is_empty());
    }

    #[test]
    fn test_response_wire_shape() {
        let mut findings = BTreeMap::new();
        findings.insert(
            SmellKind::LongMethod,
            FindingGroup::new(vec![Finding {
                file: "a.py".into(),
                line_start: 3,
                line_end: 12,
                message: "Function 'f' has 9 statements.".into(),
                snippet: None,
            }]),
        );
        let response = AnalysisResponse {
            active_smells: vec![SmellKind::LongMethod],
            findings,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "activeSmells": ["LongMethod"],
                "findings": {
                    "LongMethod": {
                        "count": 1,
                        "items": [{
                            "file": "a.py",
                            "lineStart": 3,
                            "lineEnd": 12,
                            "message": "Function 'f' has 9 statements."
                        }]
                    }
                }
            })
        );
    }

    #[test]
    fn test_empty_response() {
        let value = serde_json::to_value(AnalysisResponse::empty()).unwrap();
        assert_eq!(value, json!({"activeSmells": [], "findings": {}}));
    }
}
