//! External analyzer invocation.
//!
//! The analyzer is a black box: it receives staged file paths followed by the
//! serialized smell config as its final argument, and writes one JSON document
//! to stdout. `ProcessAnalyzer` supervises that process. It bounds the run in
//! wall-clock time and stdout size. The whole process group is killed once the
//! analyzer exits, when either bound is hit, or when the request is abandoned.

use async_trait::async_trait;
use smell_config::AnalyzerConfig;
use smell_foundation::{PipelineError, PipelineResult, SmellConfig};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Stderr bytes kept for diagnostics
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// How long to wait for a killed analyzer to be reaped
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Captured result of one analyzer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerRun {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    /// Tail of stderr, for logs only
    pub stderr: String,
}

impl AnalyzerRun {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout of a successful run; a non-zero exit is an `AnalyzerExitFailure`.
    pub fn into_stdout(self) -> PipelineResult<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(PipelineError::AnalyzerExitFailure {
                code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// The seam between the pipeline and whatever performs the detection
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Run detection over `files` with the resolved `config`.
    ///
    /// Returns `Ok` for any run that terminated, whatever its exit code.
    async fn invoke(&self, files: &[PathBuf], config: &SmellConfig) -> PipelineResult<AnalyzerRun>;
}

/// Runs the analyzer as a child process
#[derive(Debug, Clone)]
pub struct ProcessAnalyzer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    max_output_bytes: usize,
    working_dir: Option<PathBuf>,
}

impl ProcessAnalyzer {
    /// `command` is the program followed by its leading arguments.
    pub fn new(command: &[String]) -> PipelineResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| PipelineError::internal("Analyzer command cannot be empty"))?;
        let defaults = AnalyzerConfig::default();
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: Duration::from_millis(defaults.timeout_ms),
            max_output_bytes: defaults.max_output_bytes,
            working_dir: None,
        })
    }

    pub fn from_config(config: &AnalyzerConfig) -> PipelineResult<Self> {
        let analyzer = Self::new(&config.command)?
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_max_output_bytes(config.max_output_bytes);
        Ok(match config.working_dir.as_ref() {
            Some(dir) => analyzer.with_working_dir(dir),
            None => analyzer,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }

    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, files: &[PathBuf], config_json: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(files)
            .arg(config_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = self.working_dir.as_ref() {
            cmd.current_dir(dir);
        }

        // New process group so a kill reaches every descendant
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

#[async_trait]
impl Analyzer for ProcessAnalyzer {
    async fn invoke(&self, files: &[PathBuf], config: &SmellConfig) -> PipelineResult<AnalyzerRun> {
        let config_json = serde_json::to_string(config)
            .map_err(|e| PipelineError::internal(format!("Failed to serialize smell config: {}", e)))?;

        let mut child = self.command(files, &config_json).spawn().map_err(|e| {
            warn!(program = %self.program, error = %e, "Failed to spawn analyzer");
            PipelineError::AnalyzerStartFailure {
                program: self.program.clone(),
                source: e,
            }
        })?;

        let pid = child.id();
        let group = ProcessGroup::new(pid);
        debug!(program = %self.program, pid = ?pid, files = files.len(), "Analyzer started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::internal("Failed to get analyzer stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PipelineError::internal("Failed to get analyzer stderr"))?;

        // Drain stderr concurrently so a chatty analyzer cannot block on a full pipe
        let stderr_task = tokio::spawn(relay_stderr(stderr, pid));

        let limit = self.max_output_bytes;
        let outcome = timeout(self.timeout, async {
            let reaped = async {
                let status = child.wait().await?;
                // Leftover descendants would otherwise hold stdout open past the leader's exit
                group.kill();
                Ok::<_, PipelineError>(status)
            };
            tokio::try_join!(read_bounded(stdout, limit), reaped)
        })
        .await;

        let (stdout, status) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                terminate(&mut child, &group).await;
                stderr_task.abort();
                return Err(e);
            }
            Err(_) => {
                warn!(pid = ?pid, timeout_ms = self.timeout.as_millis() as u64, "Analyzer timed out");
                terminate(&mut child, &group).await;
                stderr_task.abort();
                return Err(PipelineError::AnalyzerTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };
        group.release();

        // A lingering descendant may still hold stderr open
        let stderr = match timeout(REAP_TIMEOUT, stderr_task).await {
            Ok(Ok(tail)) => tail,
            _ => String::new(),
        };
        let run = AnalyzerRun {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr,
        };

        if run.success() {
            debug!(pid = ?pid, bytes = run.stdout.len(), "Analyzer finished");
        } else {
            warn!(
                pid = ?pid,
                exit_code = ?run.exit_code,
                stderr = %run.stderr,
                "Analyzer exited unsuccessfully"
            );
        }
        Ok(run)
    }
}

/// Read `reader` to EOF, failing once more than `limit` bytes arrive.
async fn read_bounded<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> PipelineResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() + n > limit {
            return Err(PipelineError::AnalyzerOutputTooLarge { limit });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Log stderr line by line and keep the last `STDERR_TAIL_BYTES` of it.
async fn relay_stderr<R: AsyncRead + Unpin>(stderr: R, pid: Option<u32>) -> String {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    let mut tail = String::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let trimmed = text.trim_end();
                if !trimmed.is_empty() {
                    debug!(pid = ?pid, stderr = %trimmed, "Analyzer stderr");
                }
                tail.push_str(&text);
                if tail.len() > STDERR_TAIL_BYTES {
                    let mut cut = tail.len() - STDERR_TAIL_BYTES;
                    while !tail.is_char_boundary(cut) {
                        cut += 1;
                    }
                    tail.drain(..cut);
                }
            }
        }
    }
    tail
}

/// Kill the analyzer and its descendants, then reap the direct child.
async fn terminate(child: &mut Child, group: &ProcessGroup) {
    group.kill();
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Analyzer already exited");
    }
    match timeout(REAP_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) => debug!(exit_status = ?status, "Analyzer reaped"),
        Ok(Err(e)) => warn!(error = %e, "Failed to wait for killed analyzer"),
        Err(_) => warn!("Timeout waiting for killed analyzer to exit"),
    }
    group.release();
}

/// Kills the analyzer's process group if dropped while still armed.
///
/// `kill_on_drop` only reaches the direct child; this covers its descendants
/// when the request future is cancelled.
struct ProcessGroup {
    pgid: AtomicI32,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        let pgid = pid.and_then(|p| i32::try_from(p).ok()).unwrap_or(0);
        Self {
            pgid: AtomicI32::new(pgid),
        }
    }

    fn kill(&self) {
        let pgid = self.pgid.load(Ordering::SeqCst);
        if pgid <= 0 {
            return;
        }
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;
            match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                Ok(()) => debug!(pgid, "Sent SIGKILL to analyzer process group"),
                Err(e) => debug!(pgid, error = %e, "Analyzer process group already gone"),
            }
        }
    }

    fn release(&self) {
        self.pgid.store(0, Ordering::SeqCst);
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}
