//! Subprocess execution engine for the pybox server.
//!
//! This module runs the interpreter against a workspace and captures its
//! output:
//! - Direct argv invocation, never a shell, so metacharacters in user input
//!   are inert
//! - Concurrent draining of stdout and stderr while awaiting exit, so a
//!   chatty child can never deadlock on a full pipe
//! - A wall-clock timer armed at spawn that forcibly kills the child
//! - A per-stream output ceiling that kills the child the moment it is
//!   crossed, bounding memory use
//!
//! The child is always reaped before `run` returns, so workspace teardown
//! happens-after full termination.

use std::{path::Path, process::Stdio};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    sync::mpsc,
    time::sleep,
};

use crate::{
    config::Limits,
    error::{ServerError, ServerResult},
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Why the subprocess stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The subprocess exited on its own
    Normal,

    /// Killed because the wall-clock timeout elapsed
    Timeout,

    /// Killed because a stream crossed the output ceiling
    OutputLimit,

    /// The subprocess could not be spawned
    ProcessError,
}

/// Captured output and termination cause for one execution
#[derive(Debug)]
pub struct ExecutionResult {
    /// Captured stdout, truncated at the output ceiling
    pub stdout: String,

    /// Captured stderr, or the spawn error text for [`TerminationReason::ProcessError`]
    pub stderr: String,

    /// Why the subprocess stopped
    pub reason: TerminationReason,
}

/// Outcome of the wait/timeout/limit race, resolved before the child is
/// touched again so the borrow of `child.wait()` has ended
enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    LimitHit,
    TimedOut,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ExecutionResult {
    /// True iff the subprocess exited normally within limits and wrote
    /// nothing to stderr.
    ///
    /// Treating any stderr output as failure is a deliberate contract of the
    /// response shape, even though it conflates warnings with errors.
    pub fn succeeded(&self) -> bool {
        self.reason == TerminationReason::Normal && self.stderr.is_empty()
    }

    fn process_error(message: String) -> Self {
        Self {
            stdout: String::new(),
            stderr: message,
            reason: TerminationReason::ProcessError,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Run the interpreter against `entry` with `workdir` as its current
/// directory, enforcing the given limits.
///
/// Spawn failure is reported inside the result as
/// [`TerminationReason::ProcessError`] with the OS error text carried
/// verbatim; `Err` is reserved for faults of the engine itself.
pub async fn run(
    entry: &Path,
    workdir: &Path,
    python_bin: &str,
    limits: &Limits,
) -> ServerResult<ExecutionResult> {
    let mut child = match Command::new(python_bin)
        .arg(entry)
        .current_dir(workdir)
        // No .pyc files in the workspace, no output buffering
        .env("PYTHONDONTWRITEBYTECODE", "1")
        .env("PYTHONUNBUFFERED", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!("failed to spawn {}: {}", python_bin, e);
            return Ok(ExecutionResult::process_error(e.to_string()));
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ServerError::Internal("child stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ServerError::Internal("child stderr was not captured".to_string()))?;

    // Drain both streams concurrently with the exit wait; a reader signals
    // on this channel the moment its stream crosses the ceiling
    let (limit_tx, mut limit_rx) = mpsc::channel::<()>(2);
    let stdout_task = tokio::spawn(drain(stdout, limits.max_output_bytes, limit_tx.clone()));
    let stderr_task = tokio::spawn(drain(stderr, limits.max_output_bytes, limit_tx));

    // Timer armed at spawn time
    let timeout = sleep(limits.timeout);
    tokio::pin!(timeout);

    let outcome = tokio::select! {
        status = child.wait() => WaitOutcome::Exited(status),
        Some(()) = limit_rx.recv() => WaitOutcome::LimitHit,
        () = &mut timeout => WaitOutcome::TimedOut,
    };

    let mut reason = match outcome {
        WaitOutcome::Exited(Ok(_)) => TerminationReason::Normal,
        WaitOutcome::Exited(Err(e)) => {
            return Err(ServerError::Internal(format!(
                "failed to wait for subprocess: {}",
                e
            )));
        }
        WaitOutcome::LimitHit => {
            kill_and_reap(&mut child).await;
            TerminationReason::OutputLimit
        }
        WaitOutcome::TimedOut => {
            kill_and_reap(&mut child).await;
            TerminationReason::Timeout
        }
    };

    // The child has terminated, so both readers finish at EOF (or have
    // already stopped at the ceiling)
    let (stdout_buf, stdout_limited) = stdout_task
        .await
        .map_err(|e| ServerError::Internal(format!("stdout reader task failed: {}", e)))?;
    let (stderr_buf, stderr_limited) = stderr_task
        .await
        .map_err(|e| ServerError::Internal(format!("stderr reader task failed: {}", e)))?;

    // The child may cross the ceiling and exit before the limit signal wins
    // the race; the accumulated buffers are authoritative
    if reason == TerminationReason::Normal && (stdout_limited || stderr_limited) {
        reason = TerminationReason::OutputLimit;
    }

    Ok(ExecutionResult {
        stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        reason,
    })
}

/// Accumulate a stream into a buffer, stopping and signalling once the
/// ceiling is crossed. Returns the buffer (truncated at the ceiling) and
/// whether the ceiling was hit.
async fn drain<R>(mut stream: R, limit: usize, limit_tx: mpsc::Sender<()>) -> (Vec<u8>, bool)
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > limit {
                    buf.truncate(limit);
                    let _ = limit_tx.send(()).await;
                    return (buf, true);
                }
            }
            Err(_) => break,
        }
    }

    (buf, false)
}

/// Forcibly kill the child (SIGKILL, not a cooperative signal) and reap it.
async fn kill_and_reap(child: &mut Child) {
    // start_kill errors when the child already exited; the wait below
    // settles it either way
    let _ = child.start_kill();
    if let Err(e) = child.wait().await {
        tracing::warn!("failed to reap killed subprocess: {}", e);
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::config::DEFAULT_PYTHON_BIN;

    use super::*;

    async fn run_code(code: &str, limits: &Limits) -> ExecutionResult {
        let temp = tempfile::tempdir().unwrap();
        let entry = temp.path().join("main.py");
        std::fs::write(&entry, code).unwrap();
        run(&entry, temp.path(), DEFAULT_PYTHON_BIN, limits)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_normal_exit_captures_stdout() {
        let result = run_code("print(\"Hello, World!\")", &Limits::default()).await;
        assert_eq!(result.stdout, "Hello, World!\n");
        assert_eq!(result.stderr, "");
        assert_eq!(result.reason, TerminationReason::Normal);
        assert!(result.succeeded());
    }

    #[tokio::test]
    async fn test_stderr_output_means_not_succeeded() {
        let result = run_code(
            "import sys\nsys.stderr.write('deprecated')\n",
            &Limits::default(),
        )
        .await;
        assert_eq!(result.reason, TerminationReason::Normal);
        assert_eq!(result.stderr, "deprecated");
        assert!(!result.succeeded());
    }

    #[tokio::test]
    async fn test_timeout_kills_subprocess() {
        let limits = Limits {
            timeout: Duration::from_secs(1),
            ..Limits::default()
        };

        let started = Instant::now();
        let result = run_code("while True: pass", &limits).await;

        assert_eq!(result.reason, TerminationReason::Timeout);
        assert!(!result.succeeded());
        // Within timeout plus a small epsilon
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_output_ceiling_kills_subprocess() {
        let limits = Limits {
            max_output_bytes: 64 * 1024,
            ..Limits::default()
        };

        let result = run_code("while True: print('x' * 1024)", &limits).await;

        assert_eq!(result.reason, TerminationReason::OutputLimit);
        assert!(!result.succeeded());
        assert!(result.stdout.len() <= limits.max_output_bytes);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_a_process_error() {
        let temp = tempfile::tempdir().unwrap();
        let entry = temp.path().join("main.py");
        std::fs::write(&entry, "print(1)").unwrap();

        let result = run(
            &entry,
            temp.path(),
            "definitely-not-a-python-interpreter",
            &Limits::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.reason, TerminationReason::ProcessError);
        assert!(!result.succeeded());
        assert!(!result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_large_output_below_ceiling_does_not_deadlock() {
        // Well past the OS pipe buffer; only concurrent draining gets here
        let result = run_code(
            "print('y' * 256 * 1024)",
            &Limits::default(),
        )
        .await;
        assert_eq!(result.reason, TerminationReason::Normal);
        assert_eq!(result.stdout.len(), 256 * 1024 + 1);
    }
}
