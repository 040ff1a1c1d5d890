//! One analysis request, end to end.
//!
//! ```text
//! Received -> Resolving -> EmptyActiveSet -> Done
//!                       -> Staging -> Invoking -> Reconciling -> Done
//!                                             -> Failed
//! ```
//!
//! Every path that reaches `Staging` tears the workspace down before the
//! request completes. Teardown happens as soon as the analyzer has finished,
//! ahead of reconciliation, since nothing after it reads the staged files.

use crate::analyzer::{Analyzer, ProcessAnalyzer};
use crate::reconcile::{reconcile, relabel_files};
use crate::registry::SmellRegistry;
use crate::resolver::{resolve, unknown_kinds};
use crate::workspace::{validate_files, WorkspaceStager};
use smell_config::AppConfig;
use smell_foundation::{AnalysisRequest, AnalysisResponse, PipelineError, PipelineResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AnalysisPipeline {
    registry: Arc<SmellRegistry>,
    stager: WorkspaceStager,
    analyzer: Arc<dyn Analyzer>,
    reject_unknown: bool,
}

impl AnalysisPipeline {
    pub fn new(
        registry: Arc<SmellRegistry>,
        stager: WorkspaceStager,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        Self {
            registry,
            stager,
            analyzer,
            reject_unknown: false,
        }
    }

    /// Build the production pipeline: defaults file, scratch root, process analyzer.
    pub fn from_config(config: &AppConfig) -> PipelineResult<Self> {
        let registry = Arc::new(SmellRegistry::load(&config.smells.defaults_file));
        let stager = WorkspaceStager::new(config.workspace.resolved_scratch_root());
        let analyzer = Arc::new(ProcessAnalyzer::from_config(&config.analyzer)?);
        Ok(Self::new(registry, stager, analyzer).with_reject_unknown(config.smells.reject_unknown))
    }

    /// Treat override names outside the registry as an invalid request.
    pub fn with_reject_unknown(mut self, reject: bool) -> Self {
        self.reject_unknown = reject;
        self
    }

    pub fn registry(&self) -> &Arc<SmellRegistry> {
        &self.registry
    }

    pub fn stager(&self) -> &WorkspaceStager {
        &self.stager
    }

    /// Run `request` under a freshly generated request id.
    pub async fn run(&self, request: AnalysisRequest) -> PipelineResult<AnalysisResponse> {
        let request_id = Uuid::new_v4().to_string();
        self.run_with_id(&request_id, request).await
    }

    pub async fn run_with_id(
        &self,
        request_id: &str,
        request: AnalysisRequest,
    ) -> PipelineResult<AnalysisResponse> {
        let started = Instant::now();
        let AnalysisRequest { files, config } = request;
        let overrides = config.unwrap_or_default();

        // Reject before touching the disk
        validate_files(&files)?;

        let unknown = unknown_kinds(&overrides);
        if !unknown.is_empty() {
            if self.reject_unknown {
                return Err(PipelineError::invalid_request(format!(
                    "Unknown smell kinds: {}",
                    unknown.join(", ")
                )));
            }
            debug!(unknown = ?unknown, "Ignoring unknown smell kinds in request config");
        }

        let defaults = self.registry.snapshot();
        let resolved = resolve(&defaults.config, &overrides);
        let active = resolved.active();
        debug!(active = ?active, "Resolved smell configuration");

        if active.is_empty() {
            info!(files = files.len(), "No smells enabled; skipping analysis");
            return Ok(AnalysisResponse::empty());
        }

        let workspace = self.stager.stage(request_id, &files).await?;
        let paths = workspace.file_paths();

        let invoked = self.analyzer.invoke(&paths, &resolved).await;

        let workspace_dir = workspace.path().to_path_buf();
        let staged = workspace.staged().to_vec();
        workspace.teardown().await;

        let result = invoked
            .and_then(|run| run.into_stdout())
            .and_then(|stdout| reconcile(&stdout, &active))
            .map(|mut response| {
                relabel_files(&mut response, &workspace_dir, &staged);
                response
            });

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => {
                let total: usize = response.findings.values().map(|g| g.count).sum();
                info!(
                    files = files.len(),
                    active = ?active,
                    findings = total,
                    elapsed_ms,
                    "Analysis completed"
                );
            }
            Err(e) => warn!(
                error = %e,
                category = e.category(),
                elapsed_ms,
                "Analysis failed"
            ),
        }
        result
    }
}
