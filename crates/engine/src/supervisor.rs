//! Child-process supervision for engine runs.
//!
//! Provides [`supervise`], the spawn + stream + deadline logic shared by
//! process-based engines. The caller builds the [`Command`]; this module
//! owns the child from spawn to reap.
//!
//! On unix the child leads its own process group, and the whole group is
//! killed when the run ends, so helpers the engine started (ffmpeg workers and
//! the like) go down with it.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::run::{RunObserver, RunOutcome, RunRequest};

/// Maximum stderr text kept for the failure diagnostic (64 KiB). Older text
/// is discarded first, since engines print the fatal error last.
const MAX_CAPTURED_STDERR: usize = 64 * 1024;

/// Diagnostic used when a failed run wrote nothing to stderr.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Spawn `cmd`, stream its output, and enforce the request deadline.
///
/// Stdout lines are passed to `observer` in order as they arrive; stderr is
/// read concurrently and kept for the diagnostic. On timeout or
/// cancellation the child's process group is killed and the child reaped
/// before returning.
pub async fn supervise(
    cmd: &mut Command,
    request: &RunRequest,
    observer: &mut dyn RunObserver,
    cancel: &CancellationToken,
) -> RunOutcome {
    // `kill_on_drop(true)` covers the case where this future itself is dropped.
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let start = Instant::now();

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(error = %e, "Failed to launch engine process");
            return RunOutcome::Failed {
                diagnostic: format!("Failed to launch engine: {e}"),
            };
        }
    };
    tracing::debug!(pid = child.id(), "Engine process started");
    let group = ProcessGroup::of(&child);
    observer.started();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let finished = {
        let run = async {
            let captured = pump_output(stdout, stderr, observer).await;
            let status = child.wait().await;
            (status, captured)
        };

        tokio::select! {
            result = tokio::time::timeout(request.deadline, run) => Some(result),
            () = cancel.cancelled() => None,
        }
    };

    match finished {
        Some(Ok((Ok(status), captured))) => {
            classify_exit(status, &captured, &request.output_path).await
        }
        Some(Ok((Err(e), _))) => {
            terminate(&mut child, &group).await;
            RunOutcome::Failed {
                diagnostic: format!("Failed to wait for engine: {e}"),
            }
        }
        Some(Err(_elapsed)) => {
            terminate(&mut child, &group).await;
            let elapsed = start.elapsed();
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                "Engine exceeded its deadline, process killed"
            );
            RunOutcome::TimedOut { elapsed }
        }
        None => {
            terminate(&mut child, &group).await;
            tracing::info!("Engine run cancelled, process killed");
            RunOutcome::Cancelled
        }
    }
}

/// Decide the outcome of a process that exited on its own.
async fn classify_exit(status: ExitStatus, stderr: &str, output_path: &Path) -> RunOutcome {
    let artifact_exists = tokio::fs::try_exists(output_path).await.unwrap_or(false);

    if status.success() && artifact_exists {
        return RunOutcome::Success {
            output_path: output_path.to_path_buf(),
        };
    }

    let detail = match stderr.trim() {
        "" => UNKNOWN_ERROR,
        text => text,
    };
    let diagnostic = match status.code() {
        Some(0) => format!(
            "Engine exited successfully but produced no output at {}: {detail}",
            output_path.display()
        ),
        Some(code) => format!("Engine exited with code {code}: {detail}"),
        None => format!("Engine terminated by signal: {detail}"),
    };
    RunOutcome::Failed { diagnostic }
}

/// Kill the child's process group, then reap the child. Errors are logged;
/// the process may already be gone.
async fn terminate(child: &mut Child, group: &ProcessGroup) {
    group.kill();
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "Engine process already exited");
    }
}

/// The engine's process group. Killed again on drop, which also covers a
/// normal exit that left background helpers behind and a dropped run future.
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self {
            pgid: child.id().and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    #[cfg(unix)]
    fn kill(&self) {
        let Some(pgid) = self.pgid else { return };
        // Safety: kill(2) with a negative pid signals every process in the
        // group; no memory is passed to the call.
        let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
        if ret != 0 {
            let errno = std::io::Error::last_os_error();
            tracing::trace!(pgid, %errno, "Engine process group already gone");
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Drain stdout and stderr concurrently until both close.
///
/// Returns the tail of stderr.
async fn pump_output<O, E>(
    stdout: Option<O>,
    stderr: Option<E>,
    observer: &mut dyn RunObserver,
) -> String
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let stdout_reader = async {
        let Some(stdout) = stdout else { return };
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = next_line(&mut reader, &mut buf).await {
            tracing::debug!(line = %line, "engine stdout");
            observer.line(&line);
        }
    };

    let stderr_reader = async {
        let mut captured = String::new();
        let Some(stderr) = stderr else {
            return captured;
        };
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        while let Some(line) = next_line(&mut reader, &mut buf).await {
            tracing::debug!(line = %line, "engine stderr");
            push_bounded(&mut captured, &line);
        }
        captured
    };

    let ((), captured) = tokio::join!(stdout_reader, stderr_reader);
    captured
}

/// Read one line, decoding invalid UTF-8 lossily so a stray byte never stops
/// the reader (a stalled reader would let the pipe fill and block the child).
async fn next_line<R>(reader: &mut BufReader<R>, buf: &mut Vec<u8>) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    buf.clear();
    match reader.read_until(b'\n', buf).await {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            let text = String::from_utf8_lossy(&buf[..]);
            Some(text.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

/// Append a line to `captured`, dropping the oldest text past the cap.
fn push_bounded(captured: &mut String, line: &str) {
    captured.push_str(line);
    captured.push('\n');
    if captured.len() > MAX_CAPTURED_STDERR {
        let mut cut = captured.len() - MAX_CAPTURED_STDERR;
        while !captured.is_char_boundary(cut) {
            cut += 1;
        }
        captured.drain(..cut);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
