//! Shared deterministic types for the run loop.
//!
//! These types carry no I/O. A [`RunRecord`] lives for exactly one loop
//! iteration: it is created when the iteration starts, completed from the
//! finished child, rendered, then dropped.

use std::process::ExitStatus;

/// Exit code reported when a status carries neither a code nor a signal.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// What a finished launch reports back to the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub exit_code: i32,
    /// Lossily decoded stdout; `None` when streams were inherited.
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

/// One run of the target executable.
///
/// Created at the start of an iteration with only its position filled in;
/// [`RunRecord::finish`] adds the result once the child has terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    /// 1-based index of this run.
    pub index: u32,
    /// Total number of configured runs.
    pub total: u32,
    /// Normalised exit code (see [`exit_code_of`]); `None` until finished.
    pub exit_code: Option<i32>,
    /// Captured stdout, if the stream was redirected.
    pub stdout: Option<String>,
    /// Captured stderr, if the stream was redirected.
    pub stderr: Option<String>,
    /// Bytes dropped from captured stdout beyond the output limit.
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    /// The child was killed after exceeding the configured timeout.
    pub timed_out: bool,
}

impl RunRecord {
    pub fn started(index: u32, total: u32) -> Self {
        Self {
            index,
            total,
            exit_code: None,
            stdout: None,
            stderr: None,
            stdout_truncated: 0,
            stderr_truncated: 0,
            timed_out: false,
        }
    }

    pub fn finish(&mut self, outcome: LaunchOutcome) {
        self.exit_code = Some(outcome.exit_code);
        self.stdout = outcome.stdout;
        self.stderr = outcome.stderr;
        self.stdout_truncated = outcome.stdout_truncated;
        self.stderr_truncated = outcome.stderr_truncated;
        self.timed_out = outcome.timed_out;
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Normalise an [`ExitStatus`] to a single integer.
///
/// A regular exit yields its status code. On Unix a child terminated by
/// signal `s` yields `-s`; anything else yields [`UNKNOWN_EXIT_CODE`].
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    signal_code(status).unwrap_or(UNKNOWN_EXIT_CODE)
}

#[cfg(unix)]
fn signal_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| -signal)
}

#[cfg(not(unix))]
fn signal_code(_status: ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(exit_code: i32, timed_out: bool) -> LaunchOutcome {
        LaunchOutcome {
            exit_code,
            stdout: None,
            stderr: None,
            stdout_truncated: 0,
            stderr_truncated: 0,
            timed_out,
        }
    }

    fn finished(exit_code: i32, timed_out: bool) -> RunRecord {
        let mut record = RunRecord::started(1, 1);
        record.finish(outcome(exit_code, timed_out));
        record
    }

    #[test]
    fn started_record_has_position_only() {
        let record = RunRecord::started(4, 100);
        assert_eq!((record.index, record.total), (4, 100));
        assert_eq!(record.exit_code, None);
        assert!(!record.succeeded());
    }

    #[test]
    fn finish_copies_launch_outcome() {
        let mut record = RunRecord::started(2, 3);
        record.finish(LaunchOutcome {
            exit_code: 5,
            stdout: Some("out".to_string()),
            stderr: None,
            stdout_truncated: 12,
            stderr_truncated: 0,
            timed_out: false,
        });
        assert_eq!(record.index, 2);
        assert_eq!(record.exit_code, Some(5));
        assert_eq!(record.stdout.as_deref(), Some("out"));
        assert_eq!(record.stdout_truncated, 12);
    }

    #[test]
    fn zero_exit_without_timeout_succeeds() {
        assert!(finished(0, false).succeeded());
        assert!(!finished(1, false).succeeded());
        assert!(!finished(0, true).succeeded());
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_of_regular_exit() {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status: exit code lives in the second byte.
        assert_eq!(exit_code_of(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code_of(ExitStatus::from_raw(3 << 8)), 3);
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_of_signal_is_negative() {
        use std::os::unix::process::ExitStatusExt;
        // SIGKILL
        assert_eq!(exit_code_of(ExitStatus::from_raw(9)), -9);
    }
}
