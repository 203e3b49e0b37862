use super::runner::TaskRunner;
use crate::metrics::MetricsSink;
use crate::tasks::TaskDefinition;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Raised when a definition cannot be scheduled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("task '{0}' has a zero interval")]
    ZeroInterval(String),

    #[error("task '{0}' is already scheduled")]
    DuplicateName(String),
}

/// A live scheduled task: its timer resource plus the flags shared with
/// the runner loop.
struct ScheduledTask {
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// Owns the set of active recurring timers, one per scheduled definition.
///
/// Must be used from within a tokio runtime; each scheduled task runs as a
/// spawned timer loop.
pub struct SchedulerCore {
    tasks: HashMap<String, ScheduledTask>,
    metrics: Arc<MetricsSink>,
}

impl SchedulerCore {
    pub fn new(metrics: Arc<MetricsSink>) -> Self {
        Self {
            tasks: HashMap::new(),
            metrics,
        }
    }

    /// Create and start a recurring timer for a definition.
    ///
    /// The first tick fires one full interval after this call returns.
    pub fn schedule(&mut self, definition: TaskDefinition) -> Result<(), ConfigurationError> {
        if definition.interval.is_zero() {
            return Err(ConfigurationError::ZeroInterval(definition.name.clone()));
        }
        if self.tasks.contains_key(&definition.name) {
            return Err(ConfigurationError::DuplicateName(definition.name.clone()));
        }

        let name = definition.name.clone();
        let cancel = CancellationToken::new();
        let running = Arc::new(AtomicBool::new(false));
        let runner = TaskRunner::new(
            definition,
            Arc::clone(&self.metrics),
            cancel.clone(),
            Arc::clone(&running),
        );
        let worker = tokio::spawn(runner.run());

        info!("Task '{}' scheduled", name);
        self.tasks.insert(
            name,
            ScheduledTask {
                cancel,
                running,
                worker,
            },
        );
        Ok(())
    }

    /// Cancel a task's timer if present. Idempotent.
    pub fn unschedule(&mut self, name: &str) {
        if let Some(task) = self.tasks.remove(name) {
            task.cancel.cancel();
            info!("Task '{}' unscheduled", name);
        }
    }

    /// Cancel every live timer and clear the registry.
    ///
    /// No new invocation begins after this returns. An in-flight invocation
    /// is not aborted and not awaited; it finishes on its own and its
    /// outcome is still recorded.
    pub fn shutdown_all(&mut self) {
        for (name, task) in self.tasks.drain() {
            task.cancel.cancel();
            if !task.worker.is_finished() {
                debug!("Task '{}' cancelled with an invocation in flight", name);
            }
        }
    }

    /// Names of all scheduled tasks, sorted.
    pub fn active_task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether the named task has an invocation in flight right now.
    pub fn is_task_running(&self, name: &str) -> bool {
        self.tasks
            .get(name)
            .map(|task| task.running.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}
