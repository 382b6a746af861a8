//! Run configuration stored in `repeat-runner.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "repeat-runner.toml";

/// Executable launched when neither the config file nor the CLI names one.
pub const DEFAULT_EXE_PATH: &str = "/opt/pacman/Pacman";

pub const DEFAULT_NUM_RUNS: u32 = 100;

/// What happens to the child's stdout/stderr.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Child shares the parent's streams; nothing is captured or reported.
    #[default]
    Inherit,
    /// Streams are piped and reported as `Output:`/`Error:` lines.
    Capture,
}

/// Run configuration (TOML).
///
/// Immutable once loaded; [`crate::looping::run_loop`] takes it by reference.
/// Missing fields fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Executable to launch, started with no arguments.
    pub exe_path: PathBuf,

    /// Number of sequential runs.
    pub num_runs: u32,

    pub capture: CaptureMode,

    /// Kill a run after this many seconds. Unset means wait forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Keep at most this many bytes per captured stream.
    pub output_limit_bytes: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            exe_path: PathBuf::from(DEFAULT_EXE_PATH),
            num_runs: DEFAULT_NUM_RUNS,
            capture: CaptureMode::Inherit,
            timeout_secs: None,
            output_limit_bytes: 100_000,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.exe_path.as_os_str().is_empty() {
            return Err(anyhow!("exe_path must not be empty"));
        }
        if self.num_runs == 0 {
            return Err(anyhow!("num_runs must be > 0"));
        }
        if self.timeout_secs == Some(0) {
            return Err(anyhow!("timeout_secs must be > 0 when set"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Overrides taken from the command line; `None` keeps the loaded value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub exe_path: Option<PathBuf>,
    pub num_runs: Option<u32>,
    pub capture: Option<CaptureMode>,
    pub timeout_secs: Option<u64>,
}

/// Apply CLI overrides on top of a loaded config and re-validate.
pub fn apply_overrides(mut base: RunConfig, overrides: &ConfigOverrides) -> Result<RunConfig> {
    if let Some(exe_path) = &overrides.exe_path {
        base.exe_path = exe_path.clone();
    }
    if let Some(num_runs) = overrides.num_runs {
        base.num_runs = num_runs;
    }
    if let Some(capture) = overrides.capture {
        base.capture = capture;
    }
    if let Some(timeout_secs) = overrides.timeout_secs {
        base.timeout_secs = Some(timeout_secs);
    }
    base.validate()?;
    Ok(base)
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    if !path.exists() {
        let cfg = RunConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RunConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
