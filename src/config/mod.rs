//! Orchestrator configuration.
//!
//! A [`FileConfig`] carries raw optional values straight from TOML;
//! [`OrchestratorConfig::resolve`] merges it with the built-in defaults
//! into the strongly-typed settings the orchestrator schedules from.

mod file_config;

pub use file_config::{FileConfig, TaskFileConfig};

use crate::tasks::{BackoffPolicy, FailurePolicy};
use std::time::Duration;
use tracing::warn;

/// Task category names, used both as configuration keys and as the
/// scheduled task names.
pub const CONTENT_COLLECTION: &str = "content_collection";
pub const PRICING_OPTIMIZATION: &str = "pricing_optimization";
pub const SECURITY_SCANNING: &str = "security_scanning";
pub const SOCIAL_PUBLISHING: &str = "social_publishing";
pub const DATABASE_MAINTENANCE: &str = "database_maintenance";

/// Resolved orchestrator configuration, one settings block per category.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub critical_failure_threshold: u32,
    pub content_collection: TaskSettings,
    pub pricing_optimization: TaskSettings,
    pub security_scanning: TaskSettings,
    pub social_publishing: TaskSettings,
    pub database_maintenance: TaskSettings,
}

/// Resolved settings for one task category.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub failure_policy: FailurePolicy,
}

impl TaskSettings {
    fn new(enabled: bool, interval_minutes: f64, failure_policy: FailurePolicy) -> Self {
        Self {
            enabled,
            interval: Duration::from_secs_f64(interval_minutes * 60.0),
            failure_policy,
        }
    }

    pub fn interval_minutes(&self) -> f64 {
        self.interval.as_secs_f64() / 60.0
    }

    /// Merge a raw file section over category defaults.
    fn resolve(file: Option<TaskFileConfig>, defaults: TaskSettings) -> Self {
        let file = file.unwrap_or_default();

        let enabled = file.enabled.unwrap_or(defaults.enabled);
        let interval = file
            .interval_minutes
            .map(|minutes| Duration::from_secs_f64(minutes * 60.0))
            .unwrap_or(defaults.interval);

        let failure_policy = match file.failure_policy.as_deref() {
            Some("isolate") => FailurePolicy::IsolateOnly,
            Some("backoff") => FailurePolicy::IsolateAndBackoff(backoff_overrides(&file, &defaults)),
            Some(other) => {
                warn!("Unknown failure_policy '{}', keeping the default", other);
                defaults.failure_policy.clone()
            }
            None => match &defaults.failure_policy {
                FailurePolicy::IsolateAndBackoff(_) => {
                    FailurePolicy::IsolateAndBackoff(backoff_overrides(&file, &defaults))
                }
                FailurePolicy::IsolateOnly => FailurePolicy::IsolateOnly,
            },
        };

        Self {
            enabled,
            interval,
            failure_policy,
        }
    }
}

fn backoff_overrides(file: &TaskFileConfig, defaults: &TaskSettings) -> BackoffPolicy {
    let default_policy = match &defaults.failure_policy {
        FailurePolicy::IsolateAndBackoff(policy) => policy.clone(),
        FailurePolicy::IsolateOnly => BackoffPolicy::default(),
    };
    BackoffPolicy {
        base: file
            .base_backoff_secs
            .map(Duration::from_secs)
            .unwrap_or(default_policy.base),
        max: file
            .max_backoff_secs
            .map(Duration::from_secs)
            .unwrap_or(default_policy.max),
    }
}

fn backoff(base_secs: u64, max_secs: u64) -> FailurePolicy {
    FailurePolicy::IsolateAndBackoff(BackoffPolicy {
        base: Duration::from_secs(base_secs),
        max: Duration::from_secs(max_secs),
    })
}

impl OrchestratorConfig {
    /// Resolve a raw file config against the built-in defaults.
    pub fn resolve(file: FileConfig) -> Self {
        Self {
            critical_failure_threshold: file.critical_failure_threshold.unwrap_or(5),
            content_collection: TaskSettings::resolve(
                file.content_collection,
                TaskSettings::new(true, 30.0, backoff(60, 3600)),
            ),
            pricing_optimization: TaskSettings::resolve(
                file.pricing_optimization,
                TaskSettings::new(true, 60.0, FailurePolicy::IsolateOnly),
            ),
            security_scanning: TaskSettings::resolve(
                file.security_scanning,
                TaskSettings::new(true, 360.0, backoff(120, 7200)),
            ),
            // Social publishing needs account credentials, so it is off
            // until explicitly enabled.
            social_publishing: TaskSettings::resolve(
                file.social_publishing,
                TaskSettings::new(false, 45.0, backoff(60, 3600)),
            ),
            database_maintenance: TaskSettings::resolve(
                file.database_maintenance,
                TaskSettings::new(true, 1440.0, FailurePolicy::IsolateOnly),
            ),
        }
    }

    /// All categories with their names, in a stable order.
    pub fn categories(&self) -> [(&'static str, &TaskSettings); 5] {
        [
            (CONTENT_COLLECTION, &self.content_collection),
            (PRICING_OPTIMIZATION, &self.pricing_optimization),
            (SECURITY_SCANNING, &self.security_scanning),
            (SOCIAL_PUBLISHING, &self.social_publishing),
            (DATABASE_MAINTENANCE, &self.database_maintenance),
        ]
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::resolve(FileConfig::default())
    }
}
