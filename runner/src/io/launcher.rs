//! Launcher abstraction for starting the target executable.
//!
//! The [`Launcher`] trait decouples the run loop from real process spawning.
//! Tests use scripted launchers that return predetermined outcomes without
//! touching the process table.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::types::{LaunchOutcome, exit_code_of};
use crate::io::config::{CaptureMode, RunConfig};
use crate::io::process::run_to_completion;

/// Parameters for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Executable to start, with no arguments and the parent's environment.
    pub exe_path: PathBuf,
    pub capture: CaptureMode,
    /// `None` waits until the child exits on its own.
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
}

impl LaunchRequest {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            exe_path: config.exe_path.clone(),
            capture: config.capture,
            timeout: config.timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }
}

pub trait Launcher {
    /// Start the executable and block until it terminates.
    ///
    /// A start failure must surface as an error wrapping
    /// [`crate::io::process::LaunchError`]. A non-zero exit is not an error.
    fn launch(&self, request: &LaunchRequest) -> Result<LaunchOutcome>;
}

/// Launcher that spawns a real child process.
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    #[instrument(skip_all, fields(exe = %request.exe_path.display()))]
    fn launch(&self, request: &LaunchRequest) -> Result<LaunchOutcome> {
        let cmd = Command::new(&request.exe_path);
        let output = run_to_completion(
            cmd,
            request.capture,
            request.timeout,
            request.output_limit_bytes,
        )?;

        let exit_code = exit_code_of(output.status);
        debug!(exit_code, timed_out = output.timed_out, "launch finished");
        Ok(LaunchOutcome {
            exit_code,
            stdout: output.stdout.map(|b| String::from_utf8_lossy(&b).into_owned()),
            stderr: output.stderr.map(|b| String::from_utf8_lossy(&b).into_owned()),
            stdout_truncated: output.stdout_truncated,
            stderr_truncated: output.stderr_truncated,
            timed_out: output.timed_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::process::LaunchError;

    #[test]
    fn request_follows_config() {
        let config = RunConfig {
            exe_path: PathBuf::from("/bin/true"),
            capture: CaptureMode::Capture,
            timeout_secs: Some(7),
            output_limit_bytes: 64,
            ..RunConfig::default()
        };
        let request = LaunchRequest::from_config(&config);
        assert_eq!(request.exe_path, PathBuf::from("/bin/true"));
        assert_eq!(request.capture, CaptureMode::Capture);
        assert_eq!(request.timeout, Some(Duration::from_secs(7)));
        assert_eq!(request.output_limit_bytes, 64);
    }

    #[test]
    fn missing_executable_is_launch_error() {
        let request = LaunchRequest {
            exe_path: PathBuf::from("/no/such/dir/game"),
            capture: CaptureMode::Inherit,
            timeout: None,
            output_limit_bytes: 1024,
        };
        let err = ProcessLauncher
            .launch(&request)
            .expect_err("launch must fail");
        assert!(err.downcast_ref::<LaunchError>().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn false_reports_exit_code_one() {
        let request = LaunchRequest {
            exe_path: crate::test_support::system_binary("false"),
            capture: CaptureMode::Capture,
            timeout: None,
            output_limit_bytes: 1024,
        };
        let outcome = ProcessLauncher.launch(&request).expect("launch");
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(outcome.stdout.as_deref(), Some(""));
        assert!(!outcome.timed_out);
    }

    #[cfg(unix)]
    #[test]
    fn truncation_is_reported_in_outcome() {
        // `pwd` prints at least "/\n", so a 1-byte limit always drops bytes.
        let request = LaunchRequest {
            exe_path: crate::test_support::system_binary("pwd"),
            capture: CaptureMode::Capture,
            timeout: None,
            output_limit_bytes: 1,
        };
        let outcome = ProcessLauncher.launch(&request).expect("launch");
        assert_eq!(outcome.stdout.as_deref(), Some("/"));
        assert!(outcome.stdout_truncated > 0);
        assert_eq!(outcome.stderr_truncated, 0);
    }
}
