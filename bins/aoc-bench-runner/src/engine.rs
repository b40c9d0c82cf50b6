/// Execution Engine - Abstraction for Process Execution
///
/// **Core Responsibility:**
/// Launch one external program, capture its raw outputs, enforce a timeout.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to run a command (local child process today)
/// - Engine does NOT know languages, builds or entry files (runners' job)
/// - Engine does NOT judge outputs (evaluator's job)
///
/// Exactly one `execute` call is outstanding at a time per harness; it is
/// the only place the pipeline suspends on a child process.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Exit code reported for a process killed by the harness timeout
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code reported when the process ended on a signal without a code
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// How long to keep draining pipes after the process is gone
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A fully resolved command invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>, timeout_ms: u64) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Program name without its directory, for log lines
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

/// Raw outcome of one command
/// Produced by an ExecutionEngine, consumed by runners and the executor
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub elapsed_ms: f64,
}

impl ExecOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Execution engine trait
///
/// Any implementation must guarantee:
/// 1. Run `program` with `args` in `cwd`, stdin closed
/// 2. Respect `timeout`, killing the process unconditionally when it elapses
/// 3. Capture stdout/stderr
/// 4. Report wall-clock time from launch to resolution
///
/// `Err` is reserved for failures to launch at all; a non-zero exit is a
/// normal `ExecOutput`.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn execute(&self, spec: &CommandSpec) -> Result<ExecOutput>;
}

/// Runs commands as local child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEngine;

impl ProcessEngine {
    pub fn new() -> Self {
        ProcessEngine
    }
}

/// Incremental capture of one output pipe
///
/// Bytes land in a shared buffer as they arrive, so whatever was read
/// before the reader is abandoned is still there.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
}

impl Capture {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let reader = tokio::spawn(async move {
            let Some(mut pipe) = pipe else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                // A read error ends the capture; whatever arrived so far is kept.
                match pipe.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(&chunk[..n]),
                }
            }
        });
        Self { buf, reader }
    }

    /// Wait up to `grace` for end-of-file, then return what was captured
    async fn finish(self, grace: Duration) -> String {
        let mut reader = self.reader;
        match tokio::time::timeout(grace, &mut reader).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Output reader task failed"),
            Err(_) => {
                tracing::warn!("Output pipe still open after process exit; keeping partial capture");
                reader.abort();
            }
        }
        let bytes = std::mem::take(&mut *self.buf.lock().unwrap_or_else(PoisonError::into_inner));
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// SIGKILL every process in the child's group; the child leads its own group
#[cfg(unix)]
fn kill_process_group(pgid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pgid.and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(error = %e, pgid, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<u32>) {}

async fn kill_tree(child: &mut Child, pgid: Option<u32>, program: &str) {
    kill_process_group(pgid);
    // Also reaps the direct child
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, program = %program, "Failed to kill timed-out process");
    }
}

#[async_trait]
impl ExecutionEngine for ProcessEngine {
    async fn execute(&self, spec: &CommandSpec) -> Result<ExecOutput> {
        let started = Instant::now();

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout takes build jobs and background
        // children down with the program itself.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().with_context(|| {
            format!(
                "Failed to spawn {} in {}",
                spec.program.display(),
                spec.cwd.display()
            )
        })?;
        let pgid = child.id();

        let stdout_capture = Capture::spawn(child.stdout.take());
        let stderr_capture = Capture::spawn(child.stderr.take());

        let (exit_code, timed_out) = match tokio::time::timeout(spec.timeout, child.wait()).await {
            Ok(status) => {
                let status = status.context("Failed to wait for child process")?;
                // Stragglers left behind by a finished program would hold the pipes open
                kill_process_group(pgid);
                (status.code().unwrap_or(SIGNAL_EXIT_CODE), false)
            }
            Err(_) => {
                // No grace period: SIGKILL on unix, TerminateProcess on windows.
                kill_tree(&mut child, pgid, &spec.program_name()).await;
                (TIMEOUT_EXIT_CODE, true)
            }
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let stdout = stdout_capture.finish(DRAIN_GRACE).await;
        let stderr = stderr_capture.finish(DRAIN_GRACE).await;

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
            timed_out,
            elapsed_ms,
        })
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str, cwd: &std::path::Path, timeout_ms: u64) -> CommandSpec {
        CommandSpec::new("sh", cwd, timeout_ms).arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let out = ProcessEngine::new()
            .execute(&sh("printf '3\\n7\\n'", dir.path(), 5_000))
            .await
            .unwrap();

        assert_eq!(out.stdout, "3\n7\n");
        assert_eq!(out.exit_code, 0);
        assert!(!out.timed_out);
        assert!(out.succeeded());
        assert!(out.elapsed_ms >= 0.0 && out.elapsed_ms.is_finite());
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_stderr() {
        let dir = TempDir::new().unwrap();
        let out = ProcessEngine::new()
            .execute(&sh("echo oops >&2; exit 3", dir.path(), 5_000))
            .await
            .unwrap();

        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stderr, "oops\n");
        assert!(!out.succeeded());
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = TempDir::new().unwrap();
        let out = ProcessEngine::new()
            .execute(&sh("exec sleep 10", dir.path(), 200))
            .await
            .unwrap();

        assert!(out.timed_out);
        assert_eq!(out.exit_code, TIMEOUT_EXIT_CODE);
        assert!(!out.succeeded());
        assert!(out.elapsed_ms >= 200.0);
        assert!(out.elapsed_ms < 5_000.0);
    }

    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let dir = TempDir::new().unwrap();
        let started = Instant::now();
        let out = ProcessEngine::new()
            .execute(&sh(
                "echo partial; (sleep 2; touch alive) & wait",
                dir.path(),
                300,
            ))
            .await
            .unwrap();

        assert!(out.timed_out);
        assert_eq!(out.stdout, "partial\n");
        assert!(started.elapsed() < Duration::from_millis(1_500));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(!dir.path().join("alive").exists());
    }

    #[tokio::test]
    async fn test_timeout_keeps_output_written_before_kill() {
        let dir = TempDir::new().unwrap();
        let out = ProcessEngine::new()
            .execute(&sh("echo partial; echo warn >&2; sleep 3", dir.path(), 300))
            .await
            .unwrap();

        assert!(out.timed_out);
        assert_eq!(out.stdout, "partial\n");
        assert_eq!(out.stderr, "warn\n");
    }

    #[tokio::test]
    async fn test_capture_keeps_bytes_when_pipe_stays_open() {
        let (mut writer, reader) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"3\n7\n")
            .await
            .unwrap();

        let capture = Capture::spawn(Some(reader));
        // Writer is still alive, so end-of-file never arrives
        let captured = capture.finish(Duration::from_millis(200)).await;
        assert_eq!(captured, "3\n7\n");
        drop(writer);
    }

    #[tokio::test]
    async fn test_cwd_and_env_overrides() {
        let dir = TempDir::new().unwrap();
        let spec = sh("pwd; echo \"$BENCH_MARK\"", dir.path(), 5_000).env("BENCH_MARK", "present");
        let out = ProcessEngine::new().execute(&spec).await.unwrap();

        let mut lines = out.stdout.lines();
        let cwd = std::fs::canonicalize(lines.next().unwrap()).unwrap();
        assert_eq!(cwd, std::fs::canonicalize(dir.path()).unwrap());
        assert_eq!(lines.next(), Some("present"));
    }

    #[tokio::test]
    async fn test_stdin_is_closed() {
        let dir = TempDir::new().unwrap();
        let out = ProcessEngine::new()
            .execute(&CommandSpec::new("cat", dir.path(), 5_000))
            .await
            .unwrap();

        assert!(!out.timed_out);
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout, "");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let spec = CommandSpec::new("/definitely/not/a/real/binary", dir.path(), 1_000);
        let err = ProcessEngine::new().execute(&spec).await.unwrap_err();
        assert!(err.to_string().contains("Failed to spawn"));
    }
}
