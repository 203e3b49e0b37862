use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Domain counters reported by a successful handler run, e.g.
/// `{"articles_processed": 12}`.
///
/// Informational only: the scheduler merges them into the metrics sink
/// without interpreting them, and they are not covered by the
/// completed/failed accounting invariant.
pub type TaskCounters = HashMap<String, u64>;

/// Error surfaced by a task handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// An upstream collaborator (API, database, social network) failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The handler gave up before completing its work.
    #[error("aborted: {0}")]
    Aborted(String),

    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// Stable label for this error kind, used to tag error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::Upstream(_) => "upstream",
            HandlerError::Aborted(_) => "aborted",
            HandlerError::Other(_) => "other",
        }
    }
}

/// An asynchronous unit of recurring work, identified by the name of the
/// definition it is bound to.
///
/// Implementations must be safe to run concurrently with *other* handlers.
/// The scheduler never invokes a handler concurrently with itself: ticks
/// that fire while an invocation is still in flight are dropped.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run one invocation to completion.
    ///
    /// Returns domain counters on success. Failures (including panics) are
    /// isolated by the scheduler and can never affect other tasks.
    async fn run(&self) -> Result<TaskCounters, HandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(HandlerError::Upstream("x".into()).kind(), "upstream");
        assert_eq!(HandlerError::Aborted("x".into()).kind(), "aborted");
        assert_eq!(
            HandlerError::Other(anyhow::anyhow!("boom")).kind(),
            "other"
        );
    }

    #[test]
    fn test_error_display() {
        let err = HandlerError::Upstream("news feed returned 503".into());
        assert_eq!(err.to_string(), "upstream error: news feed returned 503");

        let err = HandlerError::Other(anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "boom");
    }
}
