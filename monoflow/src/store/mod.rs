//! Persistence of step outputs, keyed by project and stage.
//!
//! The store is the only cross-run state. Its contents feed both the cache
//! decision during discovery and the resolution of required artifacts during
//! execution.

mod file;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{Artifact, ArtifactType, Output, Stage};
use crate::errors::MonoflowError;
use crate::project::Project;

pub use file::FileOutputStore;

/// Backend holding the last output of every (project, stage) pair.
///
/// Reads are infallible by contract: a missing, unreadable or corrupt entry is
/// treated as absent so a damaged cache never blocks a build.
pub trait OutputStore: Send + Sync {
    /// Reads the last persisted output.
    fn read(&self, project: &Project, stage: Stage) -> Option<Output>;

    /// Persists an output, replacing any previous one.
    fn write(&self, project: &Project, stage: Stage, output: &Output) -> Result<(), MonoflowError>;
}

/// Finds the artifact of `artifact_type` among the project's persisted
/// outputs, scanning stages in pipeline order.
#[must_use]
pub fn find_artifact(
    store: &dyn OutputStore,
    project: &Project,
    artifact_type: ArtifactType,
) -> Option<Artifact> {
    Stage::ALL
        .iter()
        .filter_map(|stage| store.read(project, *stage))
        .find_map(|output| {
            output
                .produced_artifact
                .filter(|artifact| artifact.artifact_type == artifact_type)
        })
}

/// Output store held in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOutputStore {
    entries: Arc<RwLock<HashMap<(String, Stage), Output>>>,
}

impl InMemoryOutputStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates an entry.
    #[must_use]
    pub fn with_output(self, project: &Project, stage: Stage, output: Output) -> Self {
        self.entries
            .write()
            .insert((project.path.clone(), stage), output);
        self
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl OutputStore for InMemoryOutputStore {
    fn read(&self, project: &Project, stage: Stage) -> Option<Output> {
        self.entries
            .read()
            .get(&(project.path.clone(), stage))
            .cloned()
    }

    fn write(&self, project: &Project, stage: Stage, output: &Output) -> Result<(), MonoflowError> {
        self.entries
            .write()
            .insert((project.path.clone(), stage), output.clone());
        Ok(())
    }
}
