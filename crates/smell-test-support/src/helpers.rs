//! Request builders

use smell_foundation::{AnalysisRequest, ConfigOverrides, SourceFile};
use std::collections::BTreeMap;

/// Fluent builder for `AnalysisRequest`
#[derive(Debug, Default)]
pub struct RequestBuilder {
    files: Vec<SourceFile>,
    overrides: Option<ConfigOverrides>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, content: &str) -> Self {
        self.files.push(SourceFile::new(name, content));
        self
    }

    pub fn toggle(mut self, kind: &str, enabled: bool) -> Self {
        self.overrides_mut()
            .enabled
            .get_or_insert_with(BTreeMap::new)
            .insert(kind.to_string(), enabled);
        self
    }

    pub fn only(mut self, kinds: &[&str]) -> Self {
        self.overrides_mut().only = Some(kinds.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn exclude(mut self, kinds: &[&str]) -> Self {
        self.overrides_mut().exclude = Some(kinds.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn build(self) -> AnalysisRequest {
        AnalysisRequest {
            files: self.files,
            config: self.overrides,
        }
    }

    fn overrides_mut(&mut self) -> &mut ConfigOverrides {
        self.overrides.get_or_insert_with(ConfigOverrides::default)
    }
}

/// A one-file request with no overrides
pub fn single_file_request() -> AnalysisRequest {
    RequestBuilder::new()
        .file("main.py", "def main():\n    return 42\n")
        .build()
}
