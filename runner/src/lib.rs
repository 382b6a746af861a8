//! Sequential process launcher.
//!
//! Starts one external executable a configured number of times, waiting for
//! each run to finish and reporting its exit code (and, when enabled, its
//! captured output) on stdout.
//!
//! - **[`core`]**: Pure rendering and exit-code normalisation.
//! - **[`io`]**: Configuration loading and process spawning.
//! - **[`looping`]**: The run loop that ties both together.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
