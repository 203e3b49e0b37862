use chrono::{DateTime, Utc};
use std::fmt;

/// Severity attached to an error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recorded task failure.
///
/// Immutable after creation except for the `resolved` flag, which an
/// operator can flip through [`MetricsSink::resolve`].
///
/// [`MetricsSink::resolve`]: super::MetricsSink::resolve
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub task_name: String,
    pub message: String,
    pub severity: Severity,
    /// Task name plus the error kind label, for grouping in tooling.
    pub tags: Vec<String>,
    pub resolved: bool,
}

/// Predicates for querying error reports. Unset fields match everything;
/// set fields combine with AND semantics.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub task_name: Option<String>,
    pub severity: Option<Severity>,
    pub unresolved_only: bool,
    pub limit: Option<usize>,
}

impl ReportFilter {
    pub(crate) fn matches(&self, report: &ErrorReport) -> bool {
        if let Some(task_name) = &self.task_name {
            if report.task_name != *task_name {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if report.severity != severity {
                return false;
            }
        }
        if self.unresolved_only && report.resolved {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_report(task_name: &str, severity: Severity, resolved: bool) -> ErrorReport {
        ErrorReport {
            id: "report-1".to_string(),
            timestamp: Utc::now(),
            task_name: task_name.to_string(),
            message: "it broke".to_string(),
            severity,
            tags: vec![task_name.to_string()],
            resolved,
        }
    }

    #[test]
    fn test_severity_roundtrip() {
        for severity in [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            assert_eq!(Severity::parse(severity.as_str()), Some(severity));
        }
        assert_eq!(Severity::parse("fatal"), None);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ReportFilter::default();
        assert!(filter.matches(&make_report("news", Severity::Medium, false)));
        assert!(filter.matches(&make_report("security", Severity::Critical, true)));
    }

    #[test]
    fn test_filter_by_task_name() {
        let filter = ReportFilter {
            task_name: Some("news".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&make_report("news", Severity::Medium, false)));
        assert!(!filter.matches(&make_report("security", Severity::Medium, false)));
    }

    #[test]
    fn test_filter_by_severity() {
        let filter = ReportFilter {
            severity: Some(Severity::Critical),
            ..Default::default()
        };
        assert!(filter.matches(&make_report("news", Severity::Critical, false)));
        assert!(!filter.matches(&make_report("news", Severity::Medium, false)));
    }

    #[test]
    fn test_filter_unresolved_only() {
        let filter = ReportFilter {
            unresolved_only: true,
            ..Default::default()
        };
        assert!(filter.matches(&make_report("news", Severity::Medium, false)));
        assert!(!filter.matches(&make_report("news", Severity::Medium, true)));
    }
}
