//! Recurring task scheduling and execution.
//!
//! One timer per scheduled task; ticks that fire while an invocation is in
//! flight or inside a backoff window are dropped, not queued.

mod core;
mod runner;

pub use core::{ConfigurationError, SchedulerCore};
