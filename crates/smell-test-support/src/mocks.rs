//! Mock implementations for testing

use async_trait::async_trait;
use mockall::mock;
use smell_foundation::{PipelineResult, SmellConfig};
use smell_pipeline::{Analyzer, AnalyzerRun};
use std::path::PathBuf;

mock! {
    pub Analyzer {}

    #[async_trait]
    impl Analyzer for Analyzer {
        async fn invoke(&self, files: &[PathBuf], config: &SmellConfig) -> PipelineResult<AnalyzerRun>;
    }
}

/// Create a mock analyzer for testing
pub fn mock_analyzer() -> MockAnalyzer {
    MockAnalyzer::new()
}

/// A successful run printing `stdout`
pub fn successful_run(stdout: impl Into<String>) -> AnalyzerRun {
    AnalyzerRun {
        exit_code: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
    }
}
