//! Diagnostic tracing for the run loop.
//!
//! Stdout is the run report and callers parse it line by line, expecting
//! only `Run i/N`, `Exit code: c` and the optional `Output:`/`Error:`
//! lines. Any diagnostic written there would be read as a malformed report
//! line, so every event goes to stderr. The default filter is `warn`,
//! which keeps stderr quiet too unless a timed-out child leaves output
//! behind or a kill fails.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DIRECTIVES: &str = "warn";

/// Install the stderr subscriber, filtered by `RUST_LOG`.
///
/// ```bash
/// RUST_LOG=repeat_runner=debug repeat-runner --runs 3 2>runner.log
/// ```
pub fn init() {
    let directives = std::env::var("RUST_LOG").ok();

    tracing_subscriber::registry()
        .with(filter_for(directives.as_deref()))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Unset or unparseable directives fall back to `warn`.
fn filter_for(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
