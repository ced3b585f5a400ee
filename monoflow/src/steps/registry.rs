//! Explicit registry of step implementations.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::Step;
use crate::core::{ArtifactType, Stage};

/// Maps `(stage, step name)` to an implementation.
///
/// Built by the caller and handed to discovery and the executor.
#[derive(Default)]
pub struct StepRegistry {
    steps: RwLock<HashMap<(Stage, String), Arc<dyn Step>>>,
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.list_steps())
            .finish()
    }
}

impl StepRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step under its own name and stage, replacing any previous
    /// registration.
    pub fn register(&self, step: Arc<dyn Step>) {
        let meta = step.meta();
        let key = (meta.stage, meta.name.clone());
        debug!(stage = %meta.stage, step = %meta.name, "Registering step");
        self.steps.write().insert(key, step);
    }

    /// Registers a step and returns the registry.
    #[must_use]
    pub fn with_step(self, step: Arc<dyn Step>) -> Self {
        self.register(step);
        self
    }

    /// Looks up the implementation for a stage and step name.
    #[must_use]
    pub fn get_executor(&self, stage: Stage, step_name: &str) -> Option<Arc<dyn Step>> {
        self.steps
            .read()
            .get(&(stage, step_name.to_string()))
            .cloned()
    }

    /// Returns true if a step is registered for the stage and name.
    #[must_use]
    pub fn contains(&self, stage: Stage, step_name: &str) -> bool {
        self.steps
            .read()
            .contains_key(&(stage, step_name.to_string()))
    }

    /// Artifact type produced by the named step, if it is registered.
    #[must_use]
    pub fn produced_artifact(&self, stage: Stage, step_name: &str) -> Option<ArtifactType> {
        self.get_executor(stage, step_name)
            .map(|step| step.produced_artifact())
    }

    /// Artifact type required by the named step, if it is registered.
    #[must_use]
    pub fn required_artifact(&self, stage: Stage, step_name: &str) -> Option<ArtifactType> {
        self.get_executor(stage, step_name)
            .map(|step| step.required_artifact())
    }

    /// Lists registered `(stage, name)` pairs, sorted.
    #[must_use]
    pub fn list_steps(&self) -> Vec<(Stage, String)> {
        let mut keys: Vec<_> = self.steps.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingStep;

    #[test]
    fn test_register_and_lookup() {
        let registry = StepRegistry::new()
            .with_step(Arc::new(
                RecordingStep::new("Docker Build", Stage::Build).producing(ArtifactType::DockerImage),
            ))
            .with_step(Arc::new(
                RecordingStep::new("Helm Deploy", Stage::Deploy).requiring(ArtifactType::DockerImage),
            ));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(Stage::Build, "Docker Build"));
        assert!(!registry.contains(Stage::Deploy, "Docker Build"));
        assert!(registry.get_executor(Stage::Test, "Docker Build").is_none());
        assert_eq!(
            registry.produced_artifact(Stage::Build, "Docker Build"),
            Some(ArtifactType::DockerImage)
        );
        assert_eq!(
            registry.required_artifact(Stage::Deploy, "Helm Deploy"),
            Some(ArtifactType::DockerImage)
        );
        assert_eq!(registry.required_artifact(Stage::Deploy, "Unknown"), None);
    }

    #[test]
    fn test_same_name_in_different_stages() {
        let registry = StepRegistry::new();
        registry.register(Arc::new(RecordingStep::new("Echo", Stage::Build)));
        registry.register(Arc::new(RecordingStep::new("Echo", Stage::Test)));
        registry.register(Arc::new(RecordingStep::new("Echo", Stage::Test)));

        assert_eq!(
            registry.list_steps(),
            vec![
                (Stage::Build, "Echo".to_string()),
                (Stage::Test, "Echo".to_string())
            ]
        );
    }
}
