//! Mercato Orchestrator Library
//!
//! In-process orchestration of the Mercato marketplace server's recurring
//! background tasks: content collection, pricing optimization, security
//! scanning, social publishing and database maintenance. Each task runs on
//! its own recurring timer, failures are isolated per task, and aggregate
//! counters are exposed for the control layer's status endpoint.
//!
//! The domain task bodies, persistence and the HTTP control surface live in
//! the consuming server; this crate only knows how to schedule opaque
//! handlers and account for their outcomes.

pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod scheduler;
pub mod tasks;
pub mod telemetry;

// Re-export commonly used types for convenience
pub use config::{FileConfig, OrchestratorConfig, TaskSettings};
pub use metrics::{ErrorReport, MetricsSink, MetricsSnapshot, ReportFilter, Severity};
pub use orchestrator::{Orchestrator, OrchestratorStatus};
pub use scheduler::{ConfigurationError, SchedulerCore};
pub use tasks::{
    BackoffPolicy, FailurePolicy, HandlerError, TaskCounters, TaskDefinition, TaskHandler,
};
