use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Raw TOML configuration. Every field is optional and falls back to the
/// defaults applied in [`OrchestratorConfig::resolve`].
///
/// [`OrchestratorConfig::resolve`]: super::OrchestratorConfig::resolve
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    /// Consecutive failures at which error reports escalate to critical.
    pub critical_failure_threshold: Option<u32>,

    // Per-category sections
    pub content_collection: Option<TaskFileConfig>,
    pub pricing_optimization: Option<TaskFileConfig>,
    pub security_scanning: Option<TaskFileConfig>,
    pub social_publishing: Option<TaskFileConfig>,
    pub database_maintenance: Option<TaskFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TaskFileConfig {
    pub enabled: Option<bool>,
    /// Fractional minutes are allowed for short intervals.
    pub interval_minutes: Option<f64>,
    /// "isolate" or "backoff".
    pub failure_policy: Option<String>,
    pub base_backoff_secs: Option<u64>,
    pub max_backoff_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
