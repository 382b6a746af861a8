//! Deterministic, pure logic shared by the run loop.
//!
//! Core modules must be free of I/O side effects so they can be tested in
//! isolation.

pub mod report;
pub mod types;
