//! Serializable status views for the control layer.
//!
//! Field names follow the JSON contract consumed by the status endpoint,
//! so everything here serializes in camelCase.

use crate::config::{OrchestratorConfig, TaskSettings};
use crate::metrics::MetricsSnapshot;
use crate::tasks::{FailurePolicy, TaskCounters};
use serde::Serialize;
use std::collections::HashMap;

/// Aggregate orchestrator state returned by
/// [`Orchestrator::status`](super::Orchestrator::status).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStatus {
    pub is_running: bool,
    pub active_intervals: Vec<String>,
    pub config: Option<ConfigInfo>,
    pub metrics: MetricsInfo,
}

/// Serializable per-category configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInfo {
    pub critical_failure_threshold: u32,
    pub content_collection: TaskSettingsInfo,
    pub pricing_optimization: TaskSettingsInfo,
    pub security_scanning: TaskSettingsInfo,
    pub social_publishing: TaskSettingsInfo,
    pub database_maintenance: TaskSettingsInfo,
}

impl From<&OrchestratorConfig> for ConfigInfo {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            critical_failure_threshold: config.critical_failure_threshold,
            content_collection: (&config.content_collection).into(),
            pricing_optimization: (&config.pricing_optimization).into(),
            security_scanning: (&config.security_scanning).into(),
            social_publishing: (&config.social_publishing).into(),
            database_maintenance: (&config.database_maintenance).into(),
        }
    }
}

/// Serializable settings for one task category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSettingsInfo {
    pub enabled: bool,
    pub interval_minutes: f64,
    pub failure_policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_backoff_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff_secs: Option<u64>,
}

impl From<&TaskSettings> for TaskSettingsInfo {
    fn from(settings: &TaskSettings) -> Self {
        let (failure_policy, base_backoff_secs, max_backoff_secs) = match &settings.failure_policy {
            FailurePolicy::IsolateOnly => ("isolate".to_string(), None, None),
            FailurePolicy::IsolateAndBackoff(policy) => (
                "backoff".to_string(),
                Some(policy.base.as_secs()),
                Some(policy.max.as_secs()),
            ),
        };
        Self {
            enabled: settings.enabled,
            interval_minutes: settings.interval_minutes(),
            failure_policy,
            base_backoff_secs,
            max_backoff_secs,
        }
    }
}

/// Serializable snapshot of the metrics sink.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsInfo {
    pub start_time: String,
    pub tasks_completed: u64,
    pub errors_handled: u64,
    pub per_task_counters: HashMap<String, TaskCounters>,
}

impl From<MetricsSnapshot> for MetricsInfo {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Self {
            start_time: snapshot.start_time.to_rfc3339(),
            tasks_completed: snapshot.tasks_completed,
            errors_handled: snapshot.errors_handled,
            per_task_counters: snapshot.per_task_counters,
        }
    }
}

/// Operational detail for one scheduled task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub name: String,
    pub interval_minutes: f64,
    pub is_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::BackoffPolicy;
    use std::time::Duration;

    #[test]
    fn test_settings_info_isolate() {
        let settings = TaskSettings {
            enabled: true,
            interval: Duration::from_secs(600),
            failure_policy: FailurePolicy::IsolateOnly,
        };
        let info = TaskSettingsInfo::from(&settings);

        assert!(info.enabled);
        assert_eq!(info.interval_minutes, 10.0);
        assert_eq!(info.failure_policy, "isolate");
        assert!(info.base_backoff_secs.is_none());
        assert!(info.max_backoff_secs.is_none());
    }

    #[test]
    fn test_settings_info_backoff() {
        let settings = TaskSettings {
            enabled: false,
            interval: Duration::from_secs(90),
            failure_policy: FailurePolicy::IsolateAndBackoff(BackoffPolicy {
                base: Duration::from_secs(60),
                max: Duration::from_secs(3600),
            }),
        };
        let info = TaskSettingsInfo::from(&settings);

        assert_eq!(info.interval_minutes, 1.5);
        assert_eq!(info.failure_policy, "backoff");
        assert_eq!(info.base_backoff_secs, Some(60));
        assert_eq!(info.max_backoff_secs, Some(3600));
    }

    #[test]
    fn test_status_json_contract() {
        let config = OrchestratorConfig::default();
        let status = OrchestratorStatus {
            is_running: true,
            active_intervals: vec!["content_collection".to_string()],
            config: Some(ConfigInfo::from(&config)),
            metrics: MetricsInfo {
                start_time: "2026-08-06T12:00:00+00:00".to_string(),
                tasks_completed: 4,
                errors_handled: 1,
                per_task_counters: HashMap::new(),
            },
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["isRunning"], true);
        assert_eq!(json["activeIntervals"][0], "content_collection");
        assert_eq!(json["metrics"]["tasksCompleted"], 4);
        assert_eq!(json["metrics"]["errorsHandled"], 1);
        assert_eq!(json["metrics"]["startTime"], "2026-08-06T12:00:00+00:00");
        assert_eq!(
            json["config"]["contentCollection"]["intervalMinutes"],
            30.0
        );
        assert_eq!(json["config"]["contentCollection"]["enabled"], true);
    }

    #[test]
    fn test_metrics_info_start_time_is_rfc3339() {
        let snapshot = MetricsSnapshot {
            start_time: chrono::Utc::now(),
            tasks_completed: 0,
            errors_handled: 0,
            per_task_counters: HashMap::new(),
        };
        let info = MetricsInfo::from(snapshot);
        assert!(info.start_time.contains('T'));
        assert!(info.start_time.contains('+') || info.start_time.contains('Z'));
    }
}
