//! Helpers for running a child process to completion.
//!
//! The wait is synchronous. Streams are either inherited from the parent or
//! piped and drained on reader threads so a chatty child never blocks on a
//! full pipe.

use std::error::Error;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::config::CaptureMode;

/// The executable could not be started (missing path, permission denied, ...).
#[derive(Debug)]
pub struct LaunchError {
    pub exe_path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to start {}", self.exe_path.display())
    }
}

impl Error for LaunchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Finished child process.
///
/// `stdout`/`stderr` are `None` unless the streams were captured.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

type ReaderResult = Result<(Vec<u8>, usize)>;

/// How long to keep draining pipes after a timeout kill.
///
/// Descendants of the killed child inherit its pipes and can hold them open
/// for as long as they live.
pub const READER_GRACE_AFTER_KILL: Duration = Duration::from_millis(500);

struct Readers {
    stdout: mpsc::Receiver<ReaderResult>,
    stderr: mpsc::Receiver<ReaderResult>,
}

/// Spawn `cmd`, wait for it to exit, and collect its output.
///
/// With `timeout = None` the wait is unbounded. Otherwise the child is killed
/// once the timeout elapses and `timed_out` is set; captured output is then
/// collected for at most [`READER_GRACE_AFTER_KILL`]. `output_limit_bytes`
/// only matters in [`CaptureMode::Capture`]: bytes beyond it are drained and
/// dropped.
#[instrument(skip_all, fields(capture = ?capture, timeout_secs = ?timeout.map(|t| t.as_secs())))]
pub fn run_to_completion(
    mut cmd: Command,
    capture: CaptureMode,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    if capture == CaptureMode::Capture {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
    }

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(LaunchError {
                exe_path: PathBuf::from(cmd.get_program()),
                source: e,
            }
            .into());
        }
    };

    let readers = match capture {
        CaptureMode::Inherit => None,
        CaptureMode::Capture => match spawn_readers(&mut child, output_limit_bytes) {
            Ok(readers) => Some(readers),
            Err(e) => {
                reap_after_error(&mut child);
                return Err(e);
            }
        },
    };

    let (status, timed_out) = match wait_child(&mut child, timeout) {
        Ok(waited) => waited,
        Err(e) => {
            reap_after_error(&mut child);
            return Err(e);
        }
    };

    let (stdout, stdout_truncated, stderr, stderr_truncated) = match readers {
        None => (None, 0, None, 0),
        Some(readers) => {
            let deadline = timed_out.then(|| Instant::now() + READER_GRACE_AFTER_KILL);
            let (stdout, stdout_truncated) =
                collect_output(&readers.stdout, deadline, "stdout").context("collect stdout")?;
            let (stderr, stderr_truncated) =
                collect_output(&readers.stderr, deadline, "stderr").context("collect stderr")?;
            (Some(stdout), stdout_truncated, Some(stderr), stderr_truncated)
        }
    };

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn wait_child(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        let status = child.wait().context("wait for command")?;
        return Ok((status, false));
    };
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok((status, false)),
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().context("kill command")?;
            let status = child.wait().context("wait command after kill")?;
            Ok((status, true))
        }
    }
}

/// Best-effort kill and reap before an error propagates.
fn reap_after_error(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(err = %e, "failed to kill child after error");
    }
    if let Err(e) = child.wait() {
        warn!(err = %e, "failed to reap child after error");
    }
}

fn spawn_readers(child: &mut Child, limit: usize) -> Result<Readers> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    Ok(Readers {
        stdout: spawn_reader(stdout, limit),
        stderr: spawn_reader(stderr, limit),
    })
}

fn spawn_reader<R: Read + Send + 'static>(reader: R, limit: usize) -> mpsc::Receiver<ReaderResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone if the caller stopped waiting.
        let _ = tx.send(read_stream_limited(reader, limit));
    });
    rx
}

/// Receive one reader's result, giving up at `deadline` if one is set.
///
/// A reader still blocked at the deadline is left to finish on its own and
/// its output is dropped.
fn collect_output(
    rx: &mpsc::Receiver<ReaderResult>,
    deadline: Option<Instant>,
    stream: &str,
) -> ReaderResult {
    let Some(deadline) = deadline else {
        return rx
            .recv()
            .map_err(|_| anyhow!("{stream} reader thread panicked"))?;
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(stream, "pipe still open after kill, dropping output");
            Ok((Vec::new(), 0))
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("{stream} reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
