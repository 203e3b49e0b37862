//! Task contracts: handlers supplied by domain modules and the static
//! definitions binding them to a schedule.

mod definition;
mod handler;

pub use definition::{BackoffPolicy, FailurePolicy, TaskDefinition};
pub use handler::{HandlerError, TaskCounters, TaskHandler};
