//! Step trait and registry.
//!
//! Steps are the pluggable implementations executed for a project in a
//! stage. A project names its step per stage; the executor resolves that name
//! through a [`StepRegistry`] built by the caller.

mod registry;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::config::RunProperties;
use crate::core::{Artifact, ArtifactType, Output, Stage};
use crate::discovery::ProjectExecution;
use crate::project::Project;

pub use registry::StepRegistry;

/// Descriptive metadata of a step implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMeta {
    /// Name projects use to refer to the step.
    pub name: String,
    /// Free text description.
    pub description: String,
    /// Implementation version.
    pub version: String,
    /// The stage the step runs in.
    pub stage: Stage,
}

impl StepMeta {
    /// Creates metadata with an empty description and version `0.0.1`.
    #[must_use]
    pub fn new(name: impl Into<String>, stage: Stage) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: "0.0.1".to_string(),
            stage,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Everything a step gets to see when it executes.
#[derive(Debug, Clone)]
pub struct StepInput {
    /// The project being executed.
    pub project: Project,
    /// Run-scoped configuration.
    pub run_properties: Arc<RunProperties>,
    /// Artifact resolved for the step's required type.
    pub required_artifact: Option<Artifact>,
    /// Compute and report but do not mutate external systems.
    pub dry_run: bool,
    /// The planned execution, including its cache decision.
    pub execution: ProjectExecution,
}

impl StepInput {
    /// Creates an input for `execution`.
    #[must_use]
    pub fn new(execution: ProjectExecution, run_properties: Arc<RunProperties>, dry_run: bool) -> Self {
        Self {
            project: execution.project.clone(),
            run_properties,
            required_artifact: None,
            dry_run,
            execution,
        }
    }

    /// Sets the resolved required artifact.
    #[must_use]
    pub fn with_required_artifact(mut self, artifact: Option<Artifact>) -> Self {
        self.required_artifact = artifact;
        self
    }
}

/// A pluggable step implementation.
///
/// Returning `Err` means the step itself broke, as opposed to reporting a
/// failed [`Output`]. The executor treats it as fatal to the whole run.
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Returns the step's metadata.
    fn meta(&self) -> &StepMeta;

    /// Type of artifact the step produces.
    fn produced_artifact(&self) -> ArtifactType {
        ArtifactType::None
    }

    /// Type of artifact the step needs from an earlier stage.
    fn required_artifact(&self) -> ArtifactType {
        ArtifactType::None
    }

    /// Step executed before this one.
    fn before(&self) -> Option<Arc<dyn Step>> {
        None
    }

    /// Step executed after this one, receiving this step's artifact.
    fn after(&self) -> Option<Arc<dyn Step>> {
        None
    }

    /// Executes the step.
    async fn execute(&self, input: StepInput) -> anyhow::Result<Output>;
}
