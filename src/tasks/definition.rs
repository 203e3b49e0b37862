//! Static task configuration.
//!
//! A definition binds a handler to a name, an interval and a failure
//! policy. Definitions are built once from configuration and never mutated;
//! all runtime state (running flag, failure counts) lives in the scheduler.

use super::handler::TaskHandler;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How the scheduler reacts when a task's handler fails.
#[derive(Debug, Clone, PartialEq)]
pub enum FailurePolicy {
    /// Record the failure and keep the regular schedule.
    IsolateOnly,
    /// Record the failure, then drop ticks for an exponentially growing
    /// window before trying again.
    IsolateAndBackoff(BackoffPolicy),
}

/// Exponential backoff parameters, capped at `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    /// Backoff window after the nth consecutive failure (1-based).
    ///
    /// `min(max, base * 2^(n-1))`: 1s, 2s, 4s, 8s, ... for a 1s base.
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        // Past 2^31 the cap has long since taken over.
        let exp = (consecutive_failures - 1).min(31);
        self.base.saturating_mul(1u32 << exp).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(60),
            max: Duration::from_secs(3600),
        }
    }
}

/// Static configuration for one recurring task.
#[derive(Clone)]
pub struct TaskDefinition {
    /// Unique name, stable for the process lifetime.
    pub name: String,
    /// Disabled definitions are never scheduled.
    pub enabled: bool,
    /// Time between the start of one invocation and the next eligible tick.
    pub interval: Duration,
    /// The domain operation to invoke; externally owned.
    pub handler: Arc<dyn TaskHandler>,
    /// What to do when the handler fails.
    pub failure_policy: FailurePolicy,
    /// Consecutive-failure count at which reports escalate to critical.
    pub critical_failure_threshold: u32,
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("interval", &self.interval)
            .field("failure_policy", &self.failure_policy)
            .field(
                "critical_failure_threshold",
                &self.critical_failure_threshold,
            )
            .finish_non_exhaustive()
    }
}
