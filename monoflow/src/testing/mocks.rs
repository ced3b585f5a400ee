//! Step doubles for testing.

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::{Artifact, ArtifactType, Output, Stage};
use crate::steps::{Step, StepInput, StepMeta};

/// What a [`RecordingStep`] saw when it was executed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedExecution {
    /// Name of the project executed.
    pub project: String,
    /// The resolved required artifact.
    pub required_artifact: Option<Artifact>,
    /// The dry run flag.
    pub dry_run: bool,
    /// The cache decision of the execution.
    pub cached: bool,
}

/// A step that records each call and succeeds.
///
/// When it declares a produced artifact type it returns an artifact of that
/// type built from its input.
#[derive(Debug)]
pub struct RecordingStep {
    meta: StepMeta,
    produced: ArtifactType,
    required: ArtifactType,
    before: Option<Arc<dyn Step>>,
    after: Option<Arc<dyn Step>>,
    output: Option<Output>,
    executions: Mutex<Vec<RecordedExecution>>,
}

impl RecordingStep {
    /// Creates a recording step.
    #[must_use]
    pub fn new(name: impl Into<String>, stage: Stage) -> Self {
        Self {
            meta: StepMeta::new(name, stage),
            produced: ArtifactType::None,
            required: ArtifactType::None,
            before: None,
            after: None,
            output: None,
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Declares the produced artifact type.
    #[must_use]
    pub fn producing(mut self, artifact_type: ArtifactType) -> Self {
        self.produced = artifact_type;
        self
    }

    /// Declares the required artifact type.
    #[must_use]
    pub fn requiring(mut self, artifact_type: ArtifactType) -> Self {
        self.required = artifact_type;
        self
    }

    /// Sets the before step.
    #[must_use]
    pub fn with_before(mut self, step: Arc<dyn Step>) -> Self {
        self.before = Some(step);
        self
    }

    /// Sets the after step.
    #[must_use]
    pub fn with_after(mut self, step: Arc<dyn Step>) -> Self {
        self.after = Some(step);
        self
    }

    /// Returns a fixed output instead of the default one.
    #[must_use]
    pub fn returning(mut self, output: Output) -> Self {
        self.output = Some(output);
        self
    }

    /// Returns the recorded executions.
    #[must_use]
    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.executions.lock().clone()
    }

    /// Returns the number of executions.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.executions.lock().len()
    }

    /// Names of the executed projects, in call order.
    #[must_use]
    pub fn executed_projects(&self) -> Vec<String> {
        self.executions
            .lock()
            .iter()
            .map(|e| e.project.clone())
            .collect()
    }
}

#[async_trait]
impl Step for RecordingStep {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn produced_artifact(&self) -> ArtifactType {
        self.produced
    }

    fn required_artifact(&self) -> ArtifactType {
        self.required
    }

    fn before(&self) -> Option<Arc<dyn Step>> {
        self.before.clone()
    }

    fn after(&self) -> Option<Arc<dyn Step>> {
        self.after.clone()
    }

    async fn execute(&self, input: StepInput) -> anyhow::Result<Output> {
        self.executions.lock().push(RecordedExecution {
            project: input.project.name.clone(),
            required_artifact: input.required_artifact.clone(),
            dry_run: input.dry_run,
            cached: input.execution.cached,
        });

        if let Some(output) = &self.output {
            return Ok(output.clone());
        }
        let output = Output::success(format!("{} ran for {}", self.meta.name, input.project.name));
        if self.produced.is_none() {
            return Ok(output);
        }
        let spec = serde_json::json!({ "project": input.project.name });
        Ok(output.with_artifact(Artifact::from_input(
            self.produced,
            &input,
            self.meta.name.clone(),
            spec,
        )))
    }
}

/// A step that reports a failed output.
#[derive(Debug)]
pub struct FailingStep {
    meta: StepMeta,
    message: String,
    calls: Mutex<usize>,
}

impl FailingStep {
    /// Creates a failing step.
    #[must_use]
    pub fn new(name: impl Into<String>, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            meta: StepMeta::new(name, stage),
            message: message.into(),
            calls: Mutex::new(0),
        }
    }

    /// Returns the number of executions.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Step for FailingStep {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    async fn execute(&self, _input: StepInput) -> anyhow::Result<Output> {
        *self.calls.lock() += 1;
        Ok(Output::failure(self.message.clone()))
    }
}

/// A step whose implementation breaks with an error.
#[derive(Debug)]
pub struct ErroringStep {
    meta: StepMeta,
    error: String,
}

impl ErroringStep {
    /// Creates an erroring step.
    #[must_use]
    pub fn new(name: impl Into<String>, stage: Stage, error: impl Into<String>) -> Self {
        Self {
            meta: StepMeta::new(name, stage),
            error: error.into(),
        }
    }
}

#[async_trait]
impl Step for ErroringStep {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    async fn execute(&self, _input: StepInput) -> anyhow::Result<Output> {
        Err(anyhow!(self.error.clone()).context(format!("{} crashed", self.meta.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProjectExecution;
    use crate::testing::{run_properties, ProjectFixture};

    fn input() -> StepInput {
        let project = ProjectFixture::new("a").build();
        StepInput::new(ProjectExecution::create(project), run_properties("r1"), false)
    }

    #[tokio::test]
    async fn test_recording_step_produces_artifact() {
        let step = RecordingStep::new("Docker Build", Stage::Build).producing(ArtifactType::DockerImage);
        let output = step.execute(input()).await.unwrap();

        assert!(output.success);
        let artifact = output.produced_artifact.unwrap();
        assert_eq!(artifact.artifact_type, ArtifactType::DockerImage);
        assert_eq!(artifact.revision, "r1");
        assert_eq!(artifact.producing_step, "Docker Build");
        assert_eq!(step.executed_projects(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_failing_and_erroring_steps() {
        let failing = FailingStep::new("Unit Tests", Stage::Test, "3 tests failed");
        let output = failing.execute(input()).await.unwrap();
        assert!(!output.success);
        assert_eq!(failing.call_count(), 1);

        let erroring = ErroringStep::new("Helm Deploy", Stage::Deploy, "cluster unreachable");
        let err = erroring.execute(input()).await.unwrap_err();
        assert_eq!(format!("{err:#}"), "Helm Deploy crashed: cluster unreachable");
    }
}
