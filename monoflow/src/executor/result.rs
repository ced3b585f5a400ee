//! Accumulated results of one invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::RunProperties;
use crate::core::{Output, Stage};
use crate::discovery::RunPlan;
use crate::errors::ExecutionException;
use crate::project::Project;
use crate::reporting::ReportAccumulator;

/// The outcome of one project in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// The stage executed.
    pub stage: Stage,
    /// The project executed.
    pub project: Project,
    /// What the step returned.
    pub output: Output,
    /// When the result was recorded.
    pub timestamp: DateTime<Utc>,
}

impl StepResult {
    /// Creates a result stamped with the current time.
    #[must_use]
    pub fn new(stage: Stage, project: Project, output: Output) -> Self {
        Self {
            stage,
            project,
            output,
            timestamp: Utc::now(),
        }
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Ordered record of what happened during one invocation.
#[derive(Debug, Clone)]
pub struct RunResult {
    run_properties: Arc<RunProperties>,
    run_plan: RunPlan,
    results: Vec<StepResult>,
    exception: Option<ExecutionException>,
    undelivered_reports: ReportAccumulator,
}

impl RunResult {
    /// Creates an empty result for a plan.
    #[must_use]
    pub fn new(run_properties: Arc<RunProperties>, run_plan: RunPlan) -> Self {
        Self {
            run_properties,
            run_plan,
            results: Vec::new(),
            exception: None,
            undelivered_reports: ReportAccumulator::new(),
        }
    }

    /// The run configuration.
    #[must_use]
    pub fn run_properties(&self) -> &Arc<RunProperties> {
        &self.run_properties
    }

    /// The plan being executed.
    #[must_use]
    pub const fn run_plan(&self) -> &RunPlan {
        &self.run_plan
    }

    /// Appends a result.
    pub fn append(&mut self, result: StepResult) {
        self.results.push(result);
    }

    /// Appends several results.
    pub fn extend(&mut self, results: impl IntoIterator<Item = StepResult>) {
        self.results.extend(results);
    }

    /// All results in append order.
    #[must_use]
    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    /// Results for `stage`, oldest first.
    #[must_use]
    pub fn results_for_stage(&self, stage: Stage) -> Vec<&StepResult> {
        let mut results: Vec<_> = self.results.iter().filter(|r| r.stage == stage).collect();
        results.sort_by_key(|r| r.timestamp);
        results
    }

    /// Results that did not succeed.
    #[must_use]
    pub fn failed_results(&self) -> Vec<&StepResult> {
        self.results.iter().filter(|r| !r.output.success).collect()
    }

    /// Returns true if any appended result failed.
    #[must_use]
    pub fn has_failed_results(&self) -> bool {
        self.results.iter().any(|r| !r.output.success)
    }

    /// Returns true if the plan contains anything to execute.
    #[must_use]
    pub fn has_run_plan_projects(&self) -> bool {
        self.run_plan.has_projects_to_run(true, false)
    }

    /// The fatal exception that stopped the run, if any.
    #[must_use]
    pub const fn exception(&self) -> Option<&ExecutionException> {
        self.exception.as_ref()
    }

    /// Records the fatal exception.
    pub fn set_exception(&mut self, exception: ExecutionException) {
        self.exception = Some(exception);
    }

    /// Folds in the deliveries that failed while reporting this run.
    pub fn record_report_failures(&mut self, deliveries: ReportAccumulator) {
        self.undelivered_reports.merge(deliveries);
    }

    /// Reports that could not be delivered. These never affect the verdict.
    #[must_use]
    pub const fn undelivered_reports(&self) -> &ReportAccumulator {
        &self.undelivered_reports
    }

    /// No result failed and no exception was raised.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exception.is_none() && !self.has_failed_results()
    }

    /// One line description of the run's state.
    #[must_use]
    pub fn status_line(&self) -> String {
        if !self.has_run_plan_projects() {
            return "Nothing to do".to_string();
        }
        if self.exception.is_some() {
            return "Failed with exception".to_string();
        }
        match self.failed_results().first() {
            None => "Successful".to_string(),
            Some(failed) => format!(
                "Failed: {} at {}: {}",
                failed.project.name, failed.stage, failed.output.message
            ),
        }
    }
}
