//! The orchestrator root: builds task definitions from configuration and
//! drives the scheduler core.
//!
//! One instance is constructed by the process entry point and handed to the
//! control layer; there is no process-global orchestrator.

mod status;

pub use status::{ConfigInfo, MetricsInfo, OrchestratorStatus, TaskInfo, TaskSettingsInfo};

use crate::config::OrchestratorConfig;
use crate::metrics::MetricsSink;
use crate::scheduler::SchedulerCore;
use crate::tasks::{TaskDefinition, TaskHandler};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Drives the full set of recurring background tasks.
///
/// `start`/`stop` are idempotent self-loops; `status` is a pure read and is
/// safe to call concurrently with either.
pub struct Orchestrator {
    metrics: Arc<MetricsSink>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    inner: RwLock<Inner>,
}

struct Inner {
    scheduler: SchedulerCore,
    running: bool,
    config: Option<OrchestratorConfig>,
}

impl Orchestrator {
    pub fn new(metrics: Arc<MetricsSink>) -> Self {
        let scheduler = SchedulerCore::new(Arc::clone(&metrics));
        Self {
            metrics,
            handlers: HashMap::new(),
            inner: RwLock::new(Inner {
                scheduler,
                running: false,
                config: None,
            }),
        }
    }

    /// Register the handler for a task category.
    ///
    /// Handlers are registered once at construction time; categories
    /// without a registered handler are skipped at start.
    pub fn register_handler(&mut self, category: &str, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(category.to_string(), handler);
    }

    /// Start all enabled tasks. No-op if already running.
    pub async fn start(&self, config: OrchestratorConfig) {
        let mut inner = self.inner.write().await;
        if inner.running {
            info!("Orchestrator already running, ignoring start request");
            return;
        }
        self.start_locked(&mut inner, config);
    }

    fn start_locked(&self, inner: &mut Inner, config: OrchestratorConfig) {
        self.metrics.mark_started();

        for (category, settings) in config.categories() {
            if !settings.enabled {
                debug!("Task '{}' disabled, not scheduling", category);
                continue;
            }
            let Some(handler) = self.handlers.get(category) else {
                warn!("Task '{}' has no registered handler, not scheduling", category);
                continue;
            };
            let definition = TaskDefinition {
                name: category.to_string(),
                enabled: true,
                interval: settings.interval,
                handler: Arc::clone(handler),
                failure_policy: settings.failure_policy.clone(),
                critical_failure_threshold: config.critical_failure_threshold,
            };
            // A single bad definition skips that task only; the rest of the
            // start proceeds and status() shows what actually got scheduled.
            if let Err(e) = inner.scheduler.schedule(definition) {
                warn!("Task '{}' not scheduled: {}", category, e);
            }
        }

        inner.running = true;
        info!(
            "Orchestrator started with {} active tasks",
            inner.scheduler.task_count()
        );
        inner.config = Some(config);
    }

    /// Stop all tasks. No-op if not running.
    ///
    /// Pending ticks are cancelled immediately; an in-flight invocation is
    /// left to finish on its own.
    pub async fn stop(&self) {
        let mut inner = self.inner.write().await;
        if !inner.running {
            info!("Orchestrator not running, ignoring stop request");
            return;
        }
        Self::stop_locked(&mut inner);
    }

    fn stop_locked(inner: &mut Inner) {
        inner.scheduler.shutdown_all();
        inner.running = false;
        info!("Orchestrator stopped");
    }

    /// Stop and start again with the last-known configuration.
    ///
    /// A warning no-op if the orchestrator has never been started.
    pub async fn restart(&self) {
        let mut inner = self.inner.write().await;
        let Some(config) = inner.config.clone() else {
            warn!("Orchestrator has never been started, ignoring restart request");
            return;
        };
        if inner.running {
            Self::stop_locked(&mut inner);
        }
        self.start_locked(&mut inner, config);
    }

    /// Aggregate view of the orchestrator. Pure read, no side effects.
    pub async fn status(&self) -> OrchestratorStatus {
        let inner = self.inner.read().await;
        OrchestratorStatus {
            is_running: inner.running,
            active_intervals: inner.scheduler.active_task_names(),
            config: inner.config.as_ref().map(ConfigInfo::from),
            metrics: MetricsInfo::from(self.metrics.snapshot()),
        }
    }

    /// Operational detail for every currently scheduled task.
    pub async fn task_infos(&self) -> Vec<TaskInfo> {
        let inner = self.inner.read().await;
        let mut infos = Vec::new();
        for name in inner.scheduler.active_task_names() {
            let interval_minutes = inner
                .config
                .as_ref()
                .and_then(|config| {
                    config
                        .categories()
                        .into_iter()
                        .find(|(category, _)| *category == name)
                        .map(|(_, settings)| settings.interval_minutes())
                })
                .unwrap_or(0.0);
            let is_running = inner.scheduler.is_task_running(&name);
            infos.push(TaskInfo {
                name,
                interval_minutes,
                is_running,
            });
        }
        infos
    }

    /// The shared metrics sink.
    pub fn metrics(&self) -> &Arc<MetricsSink> {
        &self.metrics
    }
}
