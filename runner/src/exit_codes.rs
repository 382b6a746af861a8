//! Stable exit codes for the `repeat-runner` CLI.

/// Every configured run was attempted (child exit codes do not matter).
pub const OK: i32 = 0;
/// Invalid config/arguments or any other error, such as a failed report write.
pub const INVALID: i32 = 1;
/// The target executable could not be started; the loop was aborted.
pub const LAUNCH_FAILED: i32 = 2;
