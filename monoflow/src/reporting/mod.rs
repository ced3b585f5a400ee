//! Reporting sinks for run results.
//!
//! Sinks receive the whole [`RunResult`] after each appended step result.
//! A failing sink never blocks the others.

pub mod format;

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use crate::executor::RunResult;

/// Outcome of sending one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    /// Whether the report was delivered.
    pub success: bool,
    /// Why delivery failed.
    pub exception: Option<String>,
}

impl ReportOutcome {
    /// A delivered report.
    #[must_use]
    pub const fn delivered() -> Self {
        Self {
            success: true,
            exception: None,
        }
    }

    /// A report that could not be delivered.
    #[must_use]
    pub fn failed(exception: impl Into<String>) -> Self {
        Self {
            success: false,
            exception: Some(exception.into()),
        }
    }
}

/// A destination for run reports.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Name used in logs and accumulated failures.
    fn name(&self) -> &str;

    /// Sends the current state of the run.
    async fn send_report(&self, result: &RunResult) -> ReportOutcome;
}

/// Collects failed report deliveries.
#[derive(Debug, Clone, Default)]
pub struct ReportAccumulator {
    failures: Vec<(String, String)>,
}

impl ReportAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome; returns whether it succeeded.
    pub fn add(&mut self, reporter: &str, outcome: &ReportOutcome) -> bool {
        if !outcome.success {
            let reason = outcome
                .exception
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            self.failures.push((reporter.to_string(), reason));
        }
        outcome.success
    }

    /// `(reporter, reason)` pairs of failed deliveries.
    #[must_use]
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }

    /// Returns true if any delivery failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: Self) {
        self.failures.extend(other.failures);
    }
}

/// Fan-out over every configured sink.
#[derive(Clone, Default)]
pub struct Reporters {
    sinks: Vec<Arc<dyn Reporter>>,
}

impl std::fmt::Debug for Reporters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("Reporters").field("sinks", &names).finish()
    }
}

impl Reporters {
    /// Creates a fan-out without sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.sinks.push(reporter);
        self
    }

    /// Returns true if no sink is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Sends the result to every sink concurrently.
    pub async fn send_report(&self, result: &RunResult) -> ReportAccumulator {
        let outcomes = join_all(self.sinks.iter().map(|sink| sink.send_report(result))).await;
        let mut accumulator = ReportAccumulator::new();
        for (sink, outcome) in self.sinks.iter().zip(outcomes) {
            if !accumulator.add(sink.name(), &outcome) {
                warn!(
                    reporter = sink.name(),
                    error = outcome.exception.as_deref().unwrap_or("unknown error"),
                    "Failed to send report"
                );
            }
        }
        accumulator
    }
}

/// Logs run progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter;

#[async_trait]
impl Reporter for LoggingReporter {
    fn name(&self) -> &str {
        "logging"
    }

    async fn send_report(&self, result: &RunResult) -> ReportOutcome {
        match result.results().last() {
            Some(last) => info!(
                project = %last.project.name,
                stage = %last.stage,
                success = last.output.success,
                output = %last.output.message,
                status = %result.status_line(),
                "Run progress"
            ),
            None => info!(status = %result.status_line(), "Run progress"),
        }
        ReportOutcome::delivered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::RunPlan;
    use crate::testing::run_properties;
    use parking_lot::Mutex;

    struct Broken;

    #[async_trait]
    impl Reporter for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn send_report(&self, _result: &RunResult) -> ReportOutcome {
            ReportOutcome::failed("webhook returned 500")
        }
    }

    #[derive(Default)]
    struct Counting {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Reporter for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn send_report(&self, _result: &RunResult) -> ReportOutcome {
            *self.calls.lock() += 1;
            ReportOutcome::delivered()
        }
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_block_others() {
        let counting = Arc::new(Counting::default());
        let reporters = Reporters::new()
            .with_reporter(Arc::new(Broken))
            .with_reporter(counting.clone())
            .with_reporter(Arc::new(LoggingReporter));
        let result = RunResult::new(run_properties("r1"), RunPlan::empty());

        let accumulator = reporters.send_report(&result).await;

        assert_eq!(*counting.calls.lock(), 1);
        assert!(accumulator.has_failures());
        assert_eq!(
            accumulator.failures(),
            &[("broken".to_string(), "webhook returned 500".to_string())]
        );
    }

    #[test]
    fn test_accumulator_merge() {
        let mut first = ReportAccumulator::new();
        assert!(first.add("a", &ReportOutcome::delivered()));
        let mut second = ReportAccumulator::new();
        assert!(!second.add("b", &ReportOutcome { success: false, exception: None }));

        first.merge(second);
        assert_eq!(first.failures()[0], ("b".to_string(), "unknown error".to_string()));
    }
}
