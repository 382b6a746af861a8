//! Console report rendering.
//!
//! The report is the only stdout interface of the tool, so the line shapes
//! here are stable: `Run i/N`, `Exit code: c`, and the optional
//! `Output:`/`Error:` lines for captured streams.

use crate::core::types::RunRecord;

pub fn progress_line(record: &RunRecord) -> String {
    format!("Run {}/{}", record.index, record.total)
}

pub fn exit_code_line(exit_code: i32) -> String {
    format!("Exit code: {exit_code}")
}

pub fn timeout_line(timeout_secs: u64) -> String {
    format!("Timed out after {timeout_secs}s")
}

/// Render a captured stream as `"{label}: {text}"`.
///
/// Returns `None` when nothing was captured or the text is blank once
/// surrounding whitespace is trimmed. Dropped bytes are noted at the end.
pub fn captured_line(label: &str, text: Option<&str>, truncated: usize) -> Option<String> {
    let trimmed = text?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if truncated > 0 {
        return Some(format!("{label}: {trimmed} [truncated {truncated} bytes]"));
    }
    Some(format!("{label}: {trimmed}"))
}

/// Lines reported after a run finished, in print order.
///
/// The progress line is not included; it is emitted before the child starts.
/// An unfinished record renders nothing.
pub fn result_lines(record: &RunRecord, timeout_secs: Option<u64>) -> Vec<String> {
    let Some(exit_code) = record.exit_code else {
        return Vec::new();
    };
    let mut lines = Vec::with_capacity(4);
    if record.timed_out
        && let Some(secs) = timeout_secs
    {
        lines.push(timeout_line(secs));
    }
    lines.push(exit_code_line(exit_code));
    lines.extend(captured_line(
        "Output",
        record.stdout.as_deref(),
        record.stdout_truncated,
    ));
    lines.extend(captured_line(
        "Error",
        record.stderr.as_deref(),
        record.stderr_truncated,
    ));
    lines
}
