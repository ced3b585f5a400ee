//! Error types for monoflow.
//!
//! Configuration problems (missing step, unknown executor, policy
//! violations) are not errors: they are reported as failed outputs. The types
//! here cover the failures that must stop a project or the whole invocation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::{ArtifactType, Stage};

/// The main error type for monoflow operations.
#[derive(Debug, Error)]
pub enum MonoflowError {
    /// A step implementation failed while executing.
    #[error("{0}")]
    Execution(#[from] ExecutionException),

    /// A step required an artifact that no earlier stage produced.
    #[error("{0}")]
    RequiredArtifactMissing(#[from] RequiredArtifactMissing),

    /// A project descriptor could not be loaded.
    #[error("Failed to load project {path}: {message}")]
    ProjectLoad {
        /// Path of the descriptor.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A batch of parallel commands could not be completed.
    #[error("Parallel execution failed: {0}")]
    Parallel(String),

    /// The change source could not produce a change history.
    #[error("Change source error: {0}")]
    ChangeSource(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised when a step implementation fails with an error.
///
/// Carries enough context to report the failure without a stack trace. It is
/// fatal to the invocation, not just to the project.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Execution of '{executor}' for project '{project_name}' in stage {stage} failed: {message}")]
pub struct ExecutionException {
    /// The project being executed.
    pub project_name: String,
    /// Name of the step implementation.
    pub executor: String,
    /// The stage being executed.
    pub stage: Stage,
    /// The originating failure.
    pub message: String,
}

impl ExecutionException {
    /// Creates a new execution exception.
    #[must_use]
    pub fn new(
        project_name: impl Into<String>,
        executor: impl Into<String>,
        stage: Stage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            executor: executor.into(),
            stage,
            message: message.into(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("ExecutionException"));
        map.insert("project".to_string(), serde_json::json!(self.project_name));
        map.insert("executor".to_string(), serde_json::json!(self.executor));
        map.insert("stage".to_string(), serde_json::json!(self.stage.as_str()));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map
    }
}

/// Raised when the artifact a step requires cannot be found in any persisted
/// output of the project.
///
/// Indicates a planning inconsistency: a dependent step was scheduled without
/// its producer having succeeded first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Artifact {artifact_type} required by '{step}' for project '{project_name}' was not found in any stage output")]
pub struct RequiredArtifactMissing {
    /// The project being executed.
    pub project_name: String,
    /// The step that needs the artifact.
    pub step: String,
    /// The required type.
    pub artifact_type: ArtifactType,
}

impl RequiredArtifactMissing {
    /// Creates a new missing artifact error.
    #[must_use]
    pub fn new(
        project_name: impl Into<String>,
        step: impl Into<String>,
        artifact_type: ArtifactType,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            step: step.into(),
            artifact_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_exception_display() {
        let exc = ExecutionException::new("payments", "Docker Build", Stage::Build, "daemon down");
        assert_eq!(
            exc.to_string(),
            "Execution of 'Docker Build' for project 'payments' in stage build failed: daemon down"
        );
    }

    #[test]
    fn test_execution_exception_to_dict() {
        let exc = ExecutionException::new("payments", "Helm Deploy", Stage::Deploy, "timeout");
        let dict = exc.to_dict();

        assert_eq!(dict.get("type").unwrap(), "ExecutionException");
        assert_eq!(dict.get("stage").unwrap(), "deploy");
        assert_eq!(dict.get("executor").unwrap(), "Helm Deploy");
    }

    #[test]
    fn test_missing_artifact_display() {
        let err = RequiredArtifactMissing::new("web", "Helm Deploy", ArtifactType::DockerImage);
        assert!(err.to_string().contains("docker_image"));
        assert!(err.to_string().contains("'web'"));
    }

    #[test]
    fn test_conversions() {
        let err: MonoflowError =
            ExecutionException::new("a", "b", Stage::Test, "c").into();
        assert!(matches!(err, MonoflowError::Execution(_)));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MonoflowError = io.into();
        assert!(err.to_string().starts_with("IO error"));
    }
}
