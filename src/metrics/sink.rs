use super::reports::{ErrorReport, ReportFilter, Severity};
use crate::tasks::TaskCounters;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::error;
use uuid::Uuid;

/// Default cap on retained error reports; the oldest are evicted first.
pub const DEFAULT_MAX_ERROR_REPORTS: usize = 1000;

/// Aggregate counters and error reports shared by every scheduled task.
///
/// Every mutation path is infallible from the caller's point of view: a
/// bookkeeping problem is logged and swallowed, never surfaced into a task
/// invocation.
pub struct MetricsSink {
    start_time: Mutex<DateTime<Utc>>,
    tasks_completed: AtomicU64,
    errors_handled: AtomicU64,
    per_task: Mutex<HashMap<String, TaskCounters>>,
    reports: Mutex<VecDeque<ErrorReport>>,
    max_reports: usize,
}

impl MetricsSink {
    pub fn new(max_reports: usize) -> Self {
        Self {
            start_time: Mutex::new(Utc::now()),
            tasks_completed: AtomicU64::new(0),
            errors_handled: AtomicU64::new(0),
            per_task: Mutex::new(HashMap::new()),
            reports: Mutex::new(VecDeque::new()),
            max_reports,
        }
    }

    /// Record the orchestrator (re)starting.
    ///
    /// Only the start time moves; the completed/failed totals stay
    /// monotonic across restarts.
    pub fn mark_started(&self) {
        *lock_or_recover(&self.start_time, "updating the start time") = Utc::now();
    }

    /// Record one successful invocation and merge its domain counters.
    pub fn record_success(&self, task_name: &str, counters: TaskCounters) {
        self.tasks_completed.fetch_add(1, Ordering::SeqCst);
        if counters.is_empty() {
            return;
        }
        let mut per_task = lock_or_recover(&self.per_task, "merging task counters");
        let entry = per_task.entry(task_name.to_string()).or_default();
        for (counter, value) in counters {
            *entry.entry(counter).or_insert(0) += value;
        }
    }

    /// Record one failed invocation and store an error report for it.
    pub fn record_failure(&self, task_name: &str, message: &str, severity: Severity, kind: &str) {
        self.errors_handled.fetch_add(1, Ordering::SeqCst);
        let report = ErrorReport {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            task_name: task_name.to_string(),
            message: message.to_string(),
            severity,
            tags: vec![task_name.to_string(), kind.to_string()],
            resolved: false,
        };
        let mut reports = lock_or_recover(&self.reports, "storing an error report");
        if reports.len() >= self.max_reports {
            reports.pop_front();
        }
        reports.push_back(report);
    }

    /// Immutable copy of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            start_time: *lock_or_recover(&self.start_time, "reading the start time"),
            tasks_completed: self.tasks_completed.load(Ordering::SeqCst),
            errors_handled: self.errors_handled.load(Ordering::SeqCst),
            per_task_counters: lock_or_recover(&self.per_task, "copying task counters").clone(),
        }
    }

    /// Matching error reports, newest first.
    pub fn error_reports(&self, filter: &ReportFilter) -> Vec<ErrorReport> {
        let reports = lock_or_recover(&self.reports, "querying error reports");
        let matching = reports.iter().rev().filter(|r| filter.matches(r)).cloned();
        match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    /// Mark a report as resolved. Returns false for unknown ids.
    pub fn resolve(&self, id: &str) -> bool {
        let mut reports = lock_or_recover(&self.reports, "resolving an error report");
        match reports.iter_mut().find(|r| r.id == id) {
            Some(report) => {
                report.resolved = true;
                true
            }
            None => false,
        }
    }
}

impl Default for MetricsSink {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ERROR_REPORTS)
    }
}

/// Counters frozen at a point in time.
///
/// `tasks_completed + errors_handled` equals the number of handler
/// invocations that ran to completion since the sink was created; the
/// per-task counters are best-effort values reported by the handlers
/// themselves.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub start_time: DateTime<Utc>,
    pub tasks_completed: u64,
    pub errors_handled: u64,
    pub per_task_counters: HashMap<String, TaskCounters>,
}

/// Recover from lock poisoning: metrics bookkeeping must never take a task
/// invocation down with it.
fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!("Metrics lock poisoned while {}, recovering", what);
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(pairs: &[(&str, u64)]) -> TaskCounters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_totals() {
        let sink = MetricsSink::default();
        sink.record_success("news", TaskCounters::new());
        sink.record_success("news", TaskCounters::new());
        sink.record_failure("security", "scan failed", Severity::Medium, "upstream");

        let snapshot = sink.snapshot();
        assert_eq!(snapshot.tasks_completed, 2);
        assert_eq!(snapshot.errors_handled, 1);
    }

    #[test]
    fn test_counter_conservation() {
        // Every completed invocation lands in exactly one of the two totals.
        let sink = MetricsSink::default();
        let mut invocations = 0u64;
        for i in 0..37 {
            if i % 3 == 0 {
                sink.record_failure("a", "nope", Severity::Medium, "upstream");
            } else {
                sink.record_success("b", TaskCounters::new());
            }
            invocations += 1;
        }
        let snapshot = sink.snapshot();
        assert_eq!(snapshot.tasks_completed + snapshot.errors_handled, invocations);
    }

    #[test]
    fn test_per_task_counters_merge_additively() {
        let sink = MetricsSink::default();
        sink.record_success("news", counters(&[("articles", 3), ("images", 1)]));
        sink.record_success("news", counters(&[("articles", 4)]));
        sink.record_success("pricing", counters(&[("listings", 10)]));

        let snapshot = sink.snapshot();
        assert_eq!(snapshot.per_task_counters["news"]["articles"], 7);
        assert_eq!(snapshot.per_task_counters["news"]["images"], 1);
        assert_eq!(snapshot.per_task_counters["pricing"]["listings"], 10);
    }

    #[test]
    fn test_empty_counters_leave_no_entry() {
        let sink = MetricsSink::default();
        sink.record_success("news", TaskCounters::new());
        let snapshot = sink.snapshot();
        assert!(!snapshot.per_task_counters.contains_key("news"));
    }

    #[test]
    fn test_error_reports_newest_first() {
        let sink = MetricsSink::default();
        sink.record_failure("a", "first", Severity::Medium, "upstream");
        sink.record_failure("b", "second", Severity::Medium, "upstream");
        sink.record_failure("c", "third", Severity::Medium, "upstream");

        let reports = sink.error_reports(&ReportFilter::default());
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].message, "third");
        assert_eq!(reports[1].message, "second");
        assert_eq!(reports[2].message, "first");
    }

    #[test]
    fn test_error_reports_filtered() {
        let sink = MetricsSink::default();
        sink.record_failure("news", "feed down", Severity::Medium, "upstream");
        sink.record_failure("security", "scan died", Severity::Critical, "panic");

        let filter = ReportFilter {
            task_name: Some("security".to_string()),
            ..Default::default()
        };
        let reports = sink.error_reports(&filter);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].task_name, "security");
        assert_eq!(reports[0].severity, Severity::Critical);
        assert!(reports[0].tags.contains(&"panic".to_string()));
    }

    #[test]
    fn test_error_reports_limit() {
        let sink = MetricsSink::default();
        for i in 0..10 {
            sink.record_failure("a", &format!("failure {}", i), Severity::Medium, "upstream");
        }
        let filter = ReportFilter {
            limit: Some(3),
            ..Default::default()
        };
        let reports = sink.error_reports(&filter);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].message, "failure 9");
    }

    #[test]
    fn test_resolve() {
        let sink = MetricsSink::default();
        sink.record_failure("a", "nope", Severity::Medium, "upstream");
        let id = sink.error_reports(&ReportFilter::default())[0].id.clone();

        assert!(sink.resolve(&id));
        assert!(sink.error_reports(&ReportFilter::default())[0].resolved);

        let unresolved = ReportFilter {
            unresolved_only: true,
            ..Default::default()
        };
        assert!(sink.error_reports(&unresolved).is_empty());
    }

    #[test]
    fn test_resolve_unknown_id() {
        let sink = MetricsSink::default();
        assert!(!sink.resolve("no-such-report"));
    }

    #[test]
    fn test_report_cap_evicts_oldest() {
        let sink = MetricsSink::new(2);
        sink.record_failure("a", "first", Severity::Medium, "upstream");
        sink.record_failure("a", "second", Severity::Medium, "upstream");
        sink.record_failure("a", "third", Severity::Medium, "upstream");

        let reports = sink.error_reports(&ReportFilter::default());
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].message, "third");
        assert_eq!(reports[1].message, "second");
    }

    #[test]
    fn test_mark_started_moves_start_time_only() {
        let sink = MetricsSink::default();
        sink.record_success("a", TaskCounters::new());
        let before = sink.snapshot();

        sink.mark_started();
        let after = sink.snapshot();

        assert!(after.start_time >= before.start_time);
        assert_eq!(after.tasks_completed, 1);
    }

    #[test]
    fn test_report_ids_are_unique() {
        let sink = MetricsSink::default();
        sink.record_failure("a", "x", Severity::Medium, "upstream");
        sink.record_failure("a", "y", Severity::Medium, "upstream");
        let reports = sink.error_reports(&ReportFilter::default());
        assert_ne!(reports[0].id, reports[1].id);
    }
}
