//! Typed artifacts handed from one step to the next.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::steps::StepInput;

/// The semantic kind of an artifact.
///
/// Compared by value; a step declaring `required_artifact = DockerImage` is
/// satisfied by any persisted output whose artifact has that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    /// The step neither needs nor produces an artifact.
    #[default]
    None,
    /// A container image pushed to (or built for) a registry.
    DockerImage,
    /// A set of JUnit style test reports.
    JunitTests,
    /// A handle to an application deployed through helm.
    DeployedHelmApp,
    /// A packaged archive (e.g. a zipped bundle).
    Archive,
}

impl ArtifactType {
    /// Returns true for [`ArtifactType::None`].
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::DockerImage => "docker_image",
            Self::JunitTests => "junit_tests",
            Self::DeployedHelmApp => "deployed_helm_app",
            Self::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// An artifact produced by a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// The kind of artifact.
    pub artifact_type: ArtifactType,
    /// The VCS revision the artifact was produced for.
    pub revision: String,
    /// Name of the step that produced it.
    pub producing_step: String,
    /// Type specific payload, e.g. `{"image": "registry/app:pr-12"}`.
    #[serde(default)]
    pub spec: serde_json::Value,
    /// Hash of the changes the artifact was built from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Artifact {
    /// Creates a new artifact without a change hash.
    #[must_use]
    pub fn new(
        artifact_type: ArtifactType,
        revision: impl Into<String>,
        producing_step: impl Into<String>,
        spec: serde_json::Value,
    ) -> Self {
        Self {
            artifact_type,
            revision: revision.into(),
            producing_step: producing_step.into(),
            spec,
            hash: None,
        }
    }

    /// Creates an artifact for the execution described by `input`.
    ///
    /// The revision comes from the run's versioning properties and the hash
    /// from the execution's hashed changes, so a later plan can recognise the
    /// artifact as still valid.
    #[must_use]
    pub fn from_input(
        artifact_type: ArtifactType,
        input: &StepInput,
        producing_step: impl Into<String>,
        spec: serde_json::Value,
    ) -> Self {
        Self {
            artifact_type,
            revision: input.run_properties.versioning.revision.clone(),
            producing_step: producing_step.into(),
            spec,
            hash: input.execution.hashed_changes.clone(),
        }
    }

    /// Sets the change hash.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Returns a string field of the spec payload.
    #[must_use]
    pub fn spec_str(&self, key: &str) -> Option<&str> {
        self.spec.get(key).and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_creation() {
        let artifact = Artifact::new(
            ArtifactType::DockerImage,
            "abc123",
            "Docker Build",
            serde_json::json!({"image": "app:pr-1"}),
        );

        assert_eq!(artifact.artifact_type, ArtifactType::DockerImage);
        assert_eq!(artifact.revision, "abc123");
        assert_eq!(artifact.spec_str("image"), Some("app:pr-1"));
        assert!(artifact.hash.is_none());
    }

    #[test]
    fn test_artifact_type_equality_is_by_value() {
        let a = ArtifactType::JunitTests;
        let b: ArtifactType = serde_json::from_str(r#""junit_tests""#).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, ArtifactType::DockerImage);
    }

    #[test]
    fn test_artifact_serialization_omits_missing_hash() {
        let artifact = Artifact::new(ArtifactType::Archive, "r1", "Zip", serde_json::json!({}));
        let json = serde_json::to_value(&artifact).unwrap();
        assert!(json.get("hash").is_none());

        let hashed = artifact.with_hash("deadbeef");
        let json = serde_json::to_value(&hashed).unwrap();
        assert_eq!(json["hash"], "deadbeef");
    }

    #[test]
    fn test_artifact_type_display() {
        assert_eq!(ArtifactType::DeployedHelmApp.to_string(), "deployed_helm_app");
        assert!(ArtifactType::None.is_none());
        assert!(!ArtifactType::Archive.is_none());
    }
}
