//! Test-only helpers: scripted launchers and system binary lookup.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::core::types::LaunchOutcome;
use crate::io::launcher::{LaunchRequest, Launcher};
use crate::io::process::LaunchError;

/// One scripted launch result.
#[derive(Debug, Clone)]
pub enum ScriptedLaunch {
    /// The child "ran" and finished with this outcome.
    Exited(LaunchOutcome),
    /// The executable could not be started.
    StartFailure(io::ErrorKind),
}

/// Launcher that replays a fixed script instead of spawning processes.
///
/// Running past the end of the script is an error, so tests notice extra
/// launches.
pub struct ScriptedLauncher {
    script: RefCell<VecDeque<ScriptedLaunch>>,
    calls: Cell<u32>,
}

impl ScriptedLauncher {
    pub fn new(script: Vec<ScriptedLaunch>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            calls: Cell::new(0),
        }
    }

    /// Script `codes.len()` clean exits with the given exit codes.
    pub fn exit_codes(codes: &[i32]) -> Self {
        Self::new(codes.iter().copied().map(exited).collect())
    }

    /// Number of launch attempts made so far.
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<LaunchOutcome> {
        self.calls.set(self.calls.get() + 1);
        let next = self
            .script
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted launcher exhausted"))?;
        match next {
            ScriptedLaunch::Exited(outcome) => Ok(outcome),
            ScriptedLaunch::StartFailure(kind) => Err(LaunchError {
                exe_path: request.exe_path.clone(),
                source: io::Error::from(kind),
            }
            .into()),
        }
    }
}

/// Scripted clean exit with `exit_code` and no captured output.
pub fn exited(exit_code: i32) -> ScriptedLaunch {
    ScriptedLaunch::Exited(LaunchOutcome {
        exit_code,
        stdout: None,
        stderr: None,
        stdout_truncated: 0,
        stderr_truncated: 0,
        timed_out: false,
    })
}

/// Scripted exit with captured streams.
pub fn exited_with_output(exit_code: i32, stdout: &str, stderr: &str) -> ScriptedLaunch {
    ScriptedLaunch::Exited(LaunchOutcome {
        exit_code,
        stdout: Some(stdout.to_string()),
        stderr: Some(stderr.to_string()),
        stdout_truncated: 0,
        stderr_truncated: 0,
        timed_out: false,
    })
}

/// Locate a standard utility such as `true` or `false`.
///
/// Checks `/bin` then `/usr/bin`, falling back to the `/usr/bin` path.
pub fn system_binary(name: &str) -> PathBuf {
    ["/bin", "/usr/bin"]
        .iter()
        .map(|dir| Path::new(dir).join(name))
        .find(|path| path.exists())
        .unwrap_or_else(|| Path::new("/usr/bin").join(name))
}
