//! Analyzer output reconciliation.
//!
//! The analyzer's document is trusted for content but not for shape: kinds that
//! were not requested are dropped, requested kinds it omitted are filled with an
//! empty group, and `count` is recomputed from the items.

use crate::workspace::StagedFile;
use serde::Deserialize;
use smell_foundation::{
    AnalysisResponse, Finding, FindingGroup, PipelineError, PipelineResult, SmellKind,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RawGroup {
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    items: Vec<Finding>,
}

/// Shape the analyzer's raw stdout into a response for exactly `active`.
pub fn reconcile(raw: &str, active: &[SmellKind]) -> PipelineResult<AnalysisResponse> {
    let document: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| PipelineError::output_invalid(e.to_string(), raw))?;
    let serde_json::Value::Object(mut document) = document else {
        return Err(PipelineError::output_invalid(
            "Expected a JSON object keyed by smell kind",
            raw,
        ));
    };

    let mut findings = BTreeMap::new();
    for kind in active {
        let group = match document.remove(kind.as_str()) {
            None | Some(serde_json::Value::Null) => FindingGroup::empty(),
            Some(value) => parse_group(*kind, value, raw)?,
        };
        findings.insert(*kind, group);
    }

    if !document.is_empty() {
        let dropped: Vec<&String> = document.keys().collect();
        debug!(dropped = ?dropped, "Dropping analyzer output for inactive smell kinds");
    }

    Ok(AnalysisResponse {
        active_smells: active.to_vec(),
        findings,
    })
}

fn parse_group(kind: SmellKind, value: serde_json::Value, raw: &str) -> PipelineResult<FindingGroup> {
    let group: RawGroup = serde_json::from_value(value)
        .map_err(|e| PipelineError::output_invalid(format!("{}: {}", kind, e), raw))?;

    for item in &group.items {
        if item.line_start < 1 || item.line_end < item.line_start {
            return Err(PipelineError::output_invalid(
                format!(
                    "{}: invalid line range {}-{} in {}",
                    kind, item.line_start, item.line_end, item.file
                ),
                raw,
            ));
        }
    }

    if let Some(count) = group.count.filter(|c| *c != group.items.len()) {
        warn!(
            smell = %kind,
            reported = count,
            actual = group.items.len(),
            "Analyzer count disagrees with items; using item count"
        );
    }

    Ok(FindingGroup::new(group.items))
}

/// Rewrite finding file fields that name a staged path to the submitted name.
///
/// Matches the staged path exactly, or a bare workspace-relative name; anything
/// else is left untouched.
pub fn relabel_files(response: &mut AnalysisResponse, workspace: &Path, staged: &[StagedFile]) {
    for group in response.findings.values_mut() {
        for item in &mut group.items {
            if let Some(name) = submitted_name(&item.file, workspace, staged) {
                item.file = name.to_string();
            }
        }
    }
}

fn submitted_name<'a>(file: &str, workspace: &Path, staged: &'a [StagedFile]) -> Option<&'a str> {
    let path = Path::new(file);
    staged
        .iter()
        .find(|s| s.path == path)
        .or_else(|| {
            let relative = path.strip_prefix(workspace).unwrap_or(path);
            staged.iter().find(|s| Path::new(&s.name) == relative)
        })
        .map(|s| s.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn finding(file: &str, start: u32, end: u32) -> serde_json::Value {
        serde_json::json!({
            "file": file,
            "lineStart": start,
            "lineEnd": end,
            "message": "too long"
        })
    }

    #[test]
    fn test_missing_kinds_are_filled_with_empty_groups() {
        let raw = serde_json::json!({
            "LongMethod": { "count": 1, "items": [finding("a.py", 1, 40)] }
        })
        .to_string();

        let response = reconcile(&raw, &SmellKind::ALL).unwrap();
        assert_eq!(response.active_smells, SmellKind::ALL.to_vec());
        assert_eq!(response.findings.len(), 6);
        assert_eq!(response.findings[&SmellKind::LongMethod].count, 1);
        let empty = response.findings.values().filter(|g| g.count == 0).count();
        assert_eq!(empty, 5);
    }

    #[test]
    fn test_inactive_kinds_are_dropped() {
        let raw = serde_json::json!({
            "GodClass": { "count": 1, "items": [finding("a.py", 1, 300)] },
            "MagicNumbers": { "count": 0, "items": [] },
            "Spaghetti": { "count": 9, "items": [] }
        })
        .to_string();

        let response = reconcile(&raw, &[SmellKind::MagicNumbers]).unwrap();
        assert_eq!(
            response.findings.keys().copied().collect::<Vec<_>>(),
            vec![SmellKind::MagicNumbers]
        );
    }

    #[test]
    fn test_count_is_recomputed() {
        let raw = serde_json::json!({
            "FeatureEnvy": { "count": 5, "items": [finding("a.py", 3, 3)] }
        })
        .to_string();
        let response = reconcile(&raw, &[SmellKind::FeatureEnvy]).unwrap();
        assert_eq!(response.findings[&SmellKind::FeatureEnvy].count, 1);
    }

    #[test]
    fn test_malformed_output_keeps_raw() {
        let err = reconcile("Traceback (most recent call last)", &SmellKind::ALL).unwrap_err();
        match err {
            PipelineError::AnalyzerOutputInvalid { raw, .. } => {
                assert_eq!(raw, "Traceback (most recent call last)")
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(reconcile("[1, 2]", &SmellKind::ALL).is_err());
    }

    #[test]
    fn test_bad_line_range_is_invalid() {
        let raw = serde_json::json!({
            "LongMethod": { "items": [finding("a.py", 10, 2)] }
        })
        .to_string();
        assert!(matches!(
            reconcile(&raw, &[SmellKind::LongMethod]),
            Err(PipelineError::AnalyzerOutputInvalid { .. })
        ));

        let raw = serde_json::json!({
            "LongMethod": { "items": [finding("a.py", 0, 2)] }
        })
        .to_string();
        assert!(reconcile(&raw, &[SmellKind::LongMethod]).is_err());
    }

    #[test]
    fn test_relabel_staged_paths() {
        let workspace = PathBuf::from("/scratch/analysis-1");
        let staged = vec![StagedFile {
            name: "main.py".into(),
            path: workspace.join("main.py"),
        }];
        let raw = serde_json::json!({
            "LongMethod": { "items": [
                finding("/scratch/analysis-1/main.py", 1, 2),
                finding("main.py", 4, 9),
                finding("/elsewhere/other.py", 1, 1)
            ] }
        })
        .to_string();

        let mut response = reconcile(&raw, &[SmellKind::LongMethod]).unwrap();
        relabel_files(&mut response, &workspace, &staged);
        let files: Vec<&str> = response.findings[&SmellKind::LongMethod]
            .items
            .iter()
            .map(|f| f.file.as_str())
            .collect();
        assert_eq!(files, vec!["main.py", "main.py", "/elsewhere/other.py"]);
    }
}
