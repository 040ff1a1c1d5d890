//! Request-scoped workspaces.
//!
//! Every request gets its own directory under the scratch root, named after the
//! request id. Submitted names are validated as single path components before
//! anything touches the disk, so no file can land outside its workspace.
//!
//! A `Workspace` is torn down exactly once: either explicitly through
//! `teardown`, or by `Drop` when the owning future is cancelled.

use smell_foundation::{PipelineError, PipelineResult, SourceFile};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest accepted file name, matching common filesystem limits
const MAX_NAME_LEN: usize = 255;

/// Validate that `name` is a plain file name: one normal path component.
pub fn validate_file_name(name: &str) -> PipelineResult<()> {
    if name.is_empty() {
        return Err(PipelineError::invalid_request("File name cannot be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(PipelineError::invalid_request(format!(
            "File name exceeds {} bytes",
            MAX_NAME_LEN
        )));
    }

    if name.contains(['/', '\\', '\0']) {
        return Err(PipelineError::invalid_request(format!(
            "Invalid file name '{}': path separators are not allowed",
            name.escape_default()
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(PipelineError::invalid_request(format!(
            "Invalid file name '{}'",
            name
        ))),
    }
}

/// Validate a submitted file list: non-empty, valid names, no duplicates.
pub fn validate_files(files: &[SourceFile]) -> PipelineResult<()> {
    if files.is_empty() {
        return Err(PipelineError::invalid_request("No code provided"));
    }

    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        validate_file_name(&file.name)?;
        if !seen.insert(file.name.as_str()) {
            return Err(PipelineError::invalid_request(format!(
                "Duplicate file name '{}'",
                file.name
            )));
        }
    }

    Ok(())
}

/// Counters for staged and torn-down workspaces
#[derive(Debug, Default)]
pub struct StagerStats {
    staged: AtomicUsize,
    torn_down: AtomicUsize,
}

impl StagerStats {
    pub fn staged(&self) -> usize {
        self.staged.load(Ordering::SeqCst)
    }

    pub fn torn_down(&self) -> usize {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Workspaces created but not yet removed
    pub fn live(&self) -> usize {
        self.staged().saturating_sub(self.torn_down())
    }
}

/// A submitted file and where it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub path: PathBuf,
}

/// Creates per-request workspaces under a scratch root
#[derive(Debug, Clone)]
pub struct WorkspaceStager {
    root: PathBuf,
    stats: Arc<StagerStats>,
}

impl WorkspaceStager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stats: Arc::new(StagerStats::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> Arc<StagerStats> {
        self.stats.clone()
    }

    /// Create the workspace for `request_id` and write every file into it.
    ///
    /// Names are re-validated here; a failure part way through removes the
    /// partially written workspace before returning.
    pub async fn stage(&self, request_id: &str, files: &[SourceFile]) -> PipelineResult<Workspace> {
        validate_files(files)?;
        validate_file_name(request_id)?;

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            PipelineError::workspace(
                format!("Failed to create scratch root {}", self.root.display()),
                e,
            )
        })?;
        let root = tokio::fs::canonicalize(&self.root).await.map_err(|e| {
            PipelineError::workspace(
                format!("Failed to resolve scratch root {}", self.root.display()),
                e,
            )
        })?;

        let dir = root.join(format!("analysis-{}", request_id));
        // create_dir (not create_dir_all) so an id collision fails instead of sharing
        tokio::fs::create_dir(&dir).await.map_err(|e| {
            PipelineError::workspace(format!("Failed to create workspace {}", dir.display()), e)
        })?;
        self.stats.staged.fetch_add(1, Ordering::SeqCst);

        let mut workspace = Workspace {
            dir,
            staged: Vec::with_capacity(files.len()),
            armed: true,
            stats: self.stats.clone(),
        };

        for file in files {
            let path = workspace.dir.join(&file.name);
            if let Err(e) = tokio::fs::write(&path, file.content.as_bytes()).await {
                let err = PipelineError::workspace(
                    format!("Failed to write staged file '{}'", file.name),
                    e,
                );
                workspace.teardown().await;
                return Err(err);
            }
            workspace.staged.push(StagedFile {
                name: file.name.clone(),
                path,
            });
        }

        debug!(
            workspace = %workspace.dir.display(),
            files = workspace.staged.len(),
            "Workspace staged"
        );
        Ok(workspace)
    }
}

/// An exclusively owned, request-scoped directory of staged files
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    staged: Vec<StagedFile>,
    armed: bool,
    stats: Arc<StagerStats>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn staged(&self) -> &[StagedFile] {
        &self.staged
    }

    /// Staged paths in submission order
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.staged.iter().map(|f| f.path.clone()).collect()
    }

    /// Remove the workspace directory and everything in it.
    ///
    /// Removal failures are logged, never surfaced: the request outcome is
    /// already decided by the time a workspace is torn down.
    pub async fn teardown(mut self) {
        self.armed = false;
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!(workspace = %self.dir.display(), "Workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                workspace = %self.dir.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
        self.stats.torn_down.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Reached only when the request future was dropped mid-flight
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    workspace = %self.dir.display(),
                    error = %e,
                    "Failed to remove abandoned workspace"
                );
            }
        }
        self.stats.torn_down.fetch_add(1, Ordering::SeqCst);
        debug!(workspace = %self.dir.display(), "Abandoned workspace removed on drop");
    }
}
