//! smell-pipeline: the analysis request pipeline
//!
//! One request flows through these stages:
//! 1. `resolver`: defaults + per-request overrides -> effective `SmellConfig`
//! 2. `workspace`: stage submitted files into an isolated, request-scoped directory
//! 3. `analyzer`: run the external analyzer against the staged files, bounded in time and output
//! 4. `reconcile`: parse the analyzer's document and filter it to the active set
//!
//! `pipeline::AnalysisPipeline` drives the stages and guarantees workspace teardown
//! on every exit path. `registry::SmellRegistry` holds the startup defaults snapshot.

// Prevent technical debt accumulation
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod analyzer;
pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod resolver;
pub mod workspace;

pub use analyzer::{Analyzer, AnalyzerRun, ProcessAnalyzer};
pub use pipeline::AnalysisPipeline;
pub use reconcile::{reconcile, relabel_files};
pub use registry::SmellRegistry;
pub use resolver::{resolve, unknown_kinds};
pub use workspace::{validate_file_name, validate_files, StagedFile, StagerStats, Workspace, WorkspaceStager};
