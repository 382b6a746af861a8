//! The run loop: launch the target executable `num_runs` times in sequence.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::report::{progress_line, result_lines};
use crate::core::types::RunRecord;
use crate::io::config::RunConfig;
use crate::io::launcher::{LaunchRequest, Launcher};

/// Summary of a completed loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopOutcome {
    pub runs_completed: u32,
    /// Runs that finished with a non-zero exit code (timeouts included).
    pub nonzero_exits: u32,
    pub timed_out: u32,
}

/// Launch `config.exe_path` `config.num_runs` times, writing the report to `out`.
///
/// Each iteration writes `Run i/N` before the launch and the result lines after
/// it, so run `i` is fully reported before run `i + 1` starts. A non-zero exit
/// never stops the loop. A launch error (the executable could not be started)
/// or a failed write aborts immediately.
pub fn run_loop<L: Launcher, W: Write>(
    config: &RunConfig,
    launcher: &L,
    out: &mut W,
) -> Result<LoopOutcome> {
    let request = LaunchRequest::from_config(config);
    let total = config.num_runs;
    let mut outcome = LoopOutcome::default();

    info!(exe = %config.exe_path.display(), total, "starting run loop");
    for index in 1..=total {
        let mut record = RunRecord::started(index, total);
        writeln!(out, "{}", progress_line(&record)).context("write progress")?;
        out.flush().context("flush progress")?;

        debug!(index, total, "launching");
        let launched = launcher
            .launch(&request)
            .with_context(|| format!("run {index}/{total}"))?;
        record.finish(launched);

        for line in result_lines(&record, config.timeout_secs) {
            writeln!(out, "{line}").context("write run result")?;
        }
        out.flush().context("flush run result")?;

        outcome.runs_completed += 1;
        if record.exit_code != Some(0) {
            outcome.nonzero_exits += 1;
        }
        if record.timed_out {
            outcome.timed_out += 1;
        }
        debug!(
            index = record.index,
            exit_code = ?record.exit_code,
            succeeded = record.succeeded(),
            "run finished"
        );
    }

    Ok(outcome)
}
