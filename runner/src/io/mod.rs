//! I/O helpers for the run loop.

pub mod config;
pub mod launcher;
pub mod process;
