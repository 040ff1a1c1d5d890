//! Fake analyzers and a scratch-rooted pipeline harness
//!
//! Fake analyzers are shell scripts run through `/bin/sh`, so tests exercise
//! the real process path (spawn, pipes, exit status, kill) without Python.

use smell_foundation::SmellConfig;
use smell_pipeline::{Analyzer, AnalysisPipeline, ProcessAnalyzer, SmellRegistry, WorkspaceStager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, Instant};

/// A shell-script analyzer living in its own temp directory
pub struct FakeAnalyzer {
    dir: TempDir,
    script: PathBuf,
}

impl FakeAnalyzer {
    /// Script with the given `/bin/sh` body
    pub fn from_script(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("create fake analyzer dir");
        let script = dir.path().join("analyzer.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).expect("write fake analyzer");
        Self { dir, script }
    }

    /// Prints `document` to stdout and exits 0
    pub fn emitting(document: &serde_json::Value) -> Self {
        let json = document.to_string().replace('\'', r"'\''");
        Self::from_script(&format!("printf '%s' '{}'", json))
    }

    /// Prints `document`, after recording its arguments one per line in `args.txt`
    pub fn recording(document: &serde_json::Value) -> Self {
        let json = document.to_string().replace('\'', r"'\''");
        let placeholder = Self::from_script("");
        let args = placeholder.args_file();
        let body = format!(
            "printf '%s\\n' \"$@\" > '{}'\nprintf '%s' '{}'",
            args.display(),
            json
        );
        std::fs::write(&placeholder.script, format!("#!/bin/sh\n{}\n", body))
            .expect("write fake analyzer");
        placeholder
    }

    /// Writes `stderr` and exits with `code`
    pub fn exiting(code: i32, stderr: &str) -> Self {
        Self::from_script(&format!("echo '{}' >&2\nexit {}", stderr, code))
    }

    /// Sleeps well past any test timeout
    pub fn hanging() -> Self {
        Self::from_script("sleep 60")
    }

    /// Records its pid in `pid.txt`, then becomes `sleep 60` under the same pid
    pub fn hanging_with_pid() -> Self {
        let placeholder = Self::from_script("");
        let body = format!("echo $$ > '{}'\nexec sleep 60", placeholder.pid_file().display());
        std::fs::write(&placeholder.script, format!("#!/bin/sh\n{}\n", body))
            .expect("write fake analyzer");
        placeholder
    }

    /// Prints non-JSON text and exits 0
    pub fn garbage(text: &str) -> Self {
        Self::from_script(&format!("echo '{}'", text))
    }

    pub fn command(&self) -> Vec<String> {
        vec!["/bin/sh".to_string(), self.script.display().to_string()]
    }

    pub fn process_analyzer(&self) -> ProcessAnalyzer {
        ProcessAnalyzer::new(&self.command()).expect("non-empty command")
    }

    /// Where `recording` analyzers write their arguments
    pub fn args_file(&self) -> PathBuf {
        self.dir.path().join("args.txt")
    }

    /// Where `hanging_with_pid` analyzers write their pid
    pub fn pid_file(&self) -> PathBuf {
        self.dir.path().join("pid.txt")
    }

    /// Poll until the analyzer has recorded its pid
    pub async fn wait_for_pid(&self, within: Duration) -> Option<u32> {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            let recorded = tokio::fs::read_to_string(self.pid_file()).await.ok();
            if let Some(pid) = recorded.and_then(|s| s.trim().parse().ok()) {
                return Some(pid);
            }
            sleep(Duration::from_millis(20)).await;
        }
        None
    }

    /// Arguments of the last recorded invocation
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.args_file())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// The smell config passed as the final argument of the last invocation
    pub fn recorded_config(&self) -> Option<serde_json::Value> {
        self.recorded_args()
            .last()
            .and_then(|arg| serde_json::from_str(arg).ok())
    }
}

/// A pipeline whose workspaces live under a private scratch root
pub struct TestPipeline {
    pub pipeline: AnalysisPipeline,
    scratch: TempDir,
}

impl TestPipeline {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self::with_defaults(analyzer, SmellConfig::builtin())
    }

    pub fn with_defaults(analyzer: Arc<dyn Analyzer>, defaults: SmellConfig) -> Self {
        let scratch = tempfile::tempdir().expect("create scratch root");
        let registry = Arc::new(SmellRegistry::with_defaults(defaults));
        let stager = WorkspaceStager::new(scratch.path());
        Self {
            pipeline: AnalysisPipeline::new(registry, stager, analyzer),
            scratch,
        }
    }

    /// Pipeline over a fake analyzer with a short timeout
    pub fn with_fake(fake: &FakeAnalyzer) -> Self {
        let analyzer = fake
            .process_analyzer()
            .with_timeout(Duration::from_millis(500));
        Self::new(Arc::new(analyzer))
    }

    pub fn scratch_root(&self) -> &Path {
        self.scratch.path()
    }

    /// Entries left under the scratch root
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch.path())
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }
}

/// Whether `pid` is a live process; zombies count as exited
pub fn process_alive(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    // State is the first field after the parenthesised command name
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next());
    !matches!(state, Some("Z") | Some("X") | None)
}

/// Poll until `pid` has exited, giving up after `within`
pub async fn wait_for_exit(pid: u32, within: Duration) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if !process_alive(pid) {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    !process_alive(pid)
}
