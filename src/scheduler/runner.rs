use crate::metrics::{MetricsSink, Severity};
use crate::tasks::{FailurePolicy, TaskDefinition};
use crate::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Owns one task's recurring timer and its runtime state.
pub(crate) struct TaskRunner {
    definition: TaskDefinition,
    metrics: Arc<MetricsSink>,
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    consecutive_failures: u32,
    /// Ticks before this instant are dropped; set only under
    /// `IsolateAndBackoff` once failures accumulate.
    next_eligible_tick: Option<Instant>,
}

impl TaskRunner {
    pub(crate) fn new(
        definition: TaskDefinition,
        metrics: Arc<MetricsSink>,
        cancel: CancellationToken,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            definition,
            metrics,
            cancel,
            running,
            consecutive_failures: 0,
            next_eligible_tick: None,
        }
    }

    /// Tick until cancelled.
    ///
    /// The first tick fires one full interval after scheduling; ticks that
    /// elapse while an invocation is in flight are dropped, not queued.
    pub(crate) async fn run(mut self) {
        let period = self.definition.interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Task '{}' timer cancelled", self.definition.name);
                    break;
                }
                _ = ticker.tick() => {
                    self.on_tick().await;
                }
            }
        }
    }

    /// One tick: invoke the handler if eligible and account for the outcome.
    async fn on_tick(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        if self.running.load(Ordering::SeqCst) {
            debug!(
                "Task '{}' still in flight, dropping tick",
                self.definition.name
            );
            return;
        }
        if let Some(eligible_at) = self.next_eligible_tick {
            if Instant::now() < eligible_at {
                debug!(
                    "Task '{}' inside backoff window, dropping tick",
                    self.definition.name
                );
                return;
            }
        }

        // Cleared on drop, so the flag is released even if the invocation
        // path unwinds.
        let _running = RunningGuard::engage(&self.running);
        telemetry::set_task_running(&self.definition.name, true);
        let started = Instant::now();

        // The handler runs on its own task so a panic is contained and
        // surfaces here as a JoinError.
        let handler = Arc::clone(&self.definition.handler);
        let result = tokio::spawn(async move { handler.run().await }).await;
        let elapsed = started.elapsed();

        match result {
            Ok(Ok(counters)) => {
                self.consecutive_failures = 0;
                self.next_eligible_tick = None;
                self.metrics.record_success(&self.definition.name, counters);
                telemetry::record_task_run(&self.definition.name, "success", elapsed);
                debug!(
                    "Task '{}' completed in {:?}",
                    self.definition.name, elapsed
                );
            }
            Ok(Err(err)) => {
                let kind = err.kind();
                self.record_failure(err.to_string(), kind, elapsed);
            }
            Err(join_err) => {
                self.record_failure(format!("handler panicked: {}", join_err), "panic", elapsed);
            }
        }

        telemetry::set_task_running(&self.definition.name, false);
    }

    fn record_failure(&mut self, message: String, kind: &'static str, elapsed: Duration) {
        self.consecutive_failures += 1;
        let severity = if self.consecutive_failures >= self.definition.critical_failure_threshold {
            Severity::Critical
        } else {
            Severity::Medium
        };
        self.metrics
            .record_failure(&self.definition.name, &message, severity, kind);
        telemetry::record_task_run(&self.definition.name, "failure", elapsed);

        match &self.definition.failure_policy {
            FailurePolicy::IsolateOnly => {
                warn!(
                    "Task '{}' failed ({} consecutive): {}",
                    self.definition.name, self.consecutive_failures, message
                );
            }
            FailurePolicy::IsolateAndBackoff(policy) => {
                let delay = policy.delay(self.consecutive_failures);
                self.next_eligible_tick = Some(Instant::now() + delay);
                warn!(
                    "Task '{}' failed ({} consecutive), backing off for {:?}: {}",
                    self.definition.name, self.consecutive_failures, delay, message
                );
            }
        }
    }
}

/// Sets the running flag for the scope of one invocation.
struct RunningGuard {
    flag: Arc<AtomicBool>,
}

impl RunningGuard {
    fn engage(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self {
            flag: Arc::clone(flag),
        }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
