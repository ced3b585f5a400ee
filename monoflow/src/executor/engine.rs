//! Per-project step execution.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::RunProperties;
use crate::core::{Artifact, Output, Stage};
use crate::discovery::ProjectExecution;
use crate::errors::{ExecutionException, RequiredArtifactMissing};
use crate::observability::StepTimer;
use crate::project::Project;
use crate::steps::{Step, StepInput, StepRegistry};
use crate::store::{find_artifact, OutputStore};

/// Executes the step a project declares for a stage.
///
/// Configuration problems become failed outputs. Only a broken step, a
/// missing required artifact or an unwritable store surface as
/// [`ExecutionException`].
#[derive(Clone)]
pub struct StepsExecutor {
    store: Arc<dyn OutputStore>,
    registry: Arc<StepRegistry>,
    run_properties: Arc<RunProperties>,
    dry_run: bool,
}

impl std::fmt::Debug for StepsExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepsExecutor")
            .field("registry", &self.registry)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl StepsExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(
        store: Arc<dyn OutputStore>,
        registry: Arc<StepRegistry>,
        run_properties: Arc<RunProperties>,
    ) -> Self {
        Self {
            store,
            registry,
            run_properties,
            dry_run: false,
        }
    }

    /// Sets the dry run flag handed to every step.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns the dry run flag.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Executes `execution` for `stage`.
    pub async fn execute(
        &self,
        stage: Stage,
        execution: &ProjectExecution,
    ) -> Result<Output, ExecutionException> {
        let project = &execution.project;

        let Some(step_name) = project.step_for(stage) else {
            return Ok(Output::failure(format!(
                "Stage '{stage}' not defined on project '{}'",
                project.name
            )));
        };

        if let Err(message) = self.validate_maintainers(project) {
            warn!(project = %project.name, stage = %stage, "{message}");
            return Ok(Output::failure(message));
        }

        let Some(step) = self.registry.get_executor(stage, step_name) else {
            return Ok(Output::failure(format!(
                "Executor '{step_name}' for '{stage}' not known or not registered"
            )));
        };

        if execution.cached {
            info!(project = %project.name, stage = %stage, step = %step_name, "Using cached result");
            let previous = self
                .store
                .read(project, stage)
                .and_then(|output| output.produced_artifact);
            return Ok(Output::cached(previous));
        }

        let required = self.resolve_required(stage, &step, project)?;

        if let Some(before) = step.before() {
            let before_required = self.resolve_required(stage, &before, project)?;
            let output = self.run_step(stage, &before, execution, before_required).await?;
            if !output.success {
                warn!(
                    project = %project.name,
                    stage = %stage,
                    step = %before.meta().name,
                    "Before step failed, skipping main step"
                );
                self.persist(stage, &step, project, &output)?;
                return Ok(output);
            }
        }

        let main = self.run_step(stage, &step, execution, required).await?;
        self.persist(stage, &step, project, &main)?;

        let Some(after) = step.after() else {
            return Ok(main);
        };
        let mut output = self
            .run_step(stage, &after, execution, main.produced_artifact.clone())
            .await?;
        if !main.success {
            output.message = format!(
                "{} failed, after step '{}' ran: {}",
                step.meta().name,
                after.meta().name,
                main.message
            );
            output.success = false;
        }
        // Later stages resolve against this stage's artifact, which is always
        // the main step's.
        if let Some(discarded) = output.produced_artifact.take() {
            debug!(
                project = %project.name,
                step = %after.meta().name,
                artifact = %discarded.artifact_type,
                "After step artifact not stored"
            );
        }
        output.produced_artifact = main.produced_artifact;
        self.persist(stage, &step, project, &output)?;
        Ok(output)
    }

    fn validate_maintainers(&self, project: &Project) -> Result<(), String> {
        let Some(allowed) = &self.run_properties.config.allowed_maintainers else {
            return Ok(());
        };
        let undefined: Vec<&str> = project
            .maintainers
            .iter()
            .filter(|m| !allowed.contains(m))
            .map(String::as_str)
            .collect();
        if undefined.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "Maintainer(s) '{}' of project '{}' not in allowed maintainers",
                undefined.join(", "),
                project.name
            ))
        }
    }

    fn resolve_required(
        &self,
        stage: Stage,
        step: &Arc<dyn Step>,
        project: &Project,
    ) -> Result<Option<Artifact>, ExecutionException> {
        let required = step.required_artifact();
        if required.is_none() {
            return Ok(None);
        }
        match find_artifact(self.store.as_ref(), project, required) {
            Some(artifact) => {
                debug!(
                    project = %project.name,
                    step = %step.meta().name,
                    artifact = %required,
                    revision = %artifact.revision,
                    "Resolved required artifact"
                );
                Ok(Some(artifact))
            }
            None => {
                let missing = RequiredArtifactMissing::new(&project.name, &step.meta().name, required);
                error!(project = %project.name, stage = %stage, "{missing}");
                Err(ExecutionException::new(
                    &project.name,
                    &step.meta().name,
                    stage,
                    missing.to_string(),
                ))
            }
        }
    }

    async fn run_step(
        &self,
        stage: Stage,
        step: &Arc<dyn Step>,
        execution: &ProjectExecution,
        required: Option<Artifact>,
    ) -> Result<Output, ExecutionException> {
        let name = &step.meta().name;
        let project = &execution.project.name;
        info!(project = %project, stage = %stage, step = %name, dry_run = self.dry_run, "Executing step");

        let input = StepInput::new(execution.clone(), Arc::clone(&self.run_properties), self.dry_run)
            .with_required_artifact(required);
        let timer = StepTimer::start(name.clone());

        match step.execute(input).await {
            Ok(output) => {
                info!(
                    project = %project,
                    stage = %stage,
                    step = %name,
                    success = output.success,
                    duration_ms = timer.finish(),
                    "Step finished"
                );
                Ok(output)
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(
                    project = %project,
                    stage = %stage,
                    step = %name,
                    duration_ms = timer.finish(),
                    error = %message,
                    "Step raised an error"
                );
                Err(ExecutionException::new(project, name, stage, message))
            }
        }
    }

    fn persist(
        &self,
        stage: Stage,
        step: &Arc<dyn Step>,
        project: &Project,
        output: &Output,
    ) -> Result<(), ExecutionException> {
        self.store.write(project, stage, output).map_err(|err| {
            error!(project = %project.name, stage = %stage, error = %err, "Failed to persist output");
            ExecutionException::new(
                &project.name,
                &step.meta().name,
                stage,
                format!("Failed to persist output: {err}"),
            )
        })
    }
}
