//! Step output, the unit persisted to the artifact store.

use super::{Artifact, ArtifactType};
use serde::{Deserialize, Serialize};

/// Message attached to outputs synthesized for cached executions.
pub const CACHED_MESSAGE: &str = "This step was cached";

/// The result of a step execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Whether the step succeeded.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// Artifact produced by the step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_artifact: Option<Artifact>,
}

impl Output {
    /// Creates a successful output.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            produced_artifact: None,
        }
    }

    /// Creates a failed output.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            produced_artifact: None,
        }
    }

    /// Creates the output reported for an execution that was skipped because
    /// its previous result is still valid.
    #[must_use]
    pub fn cached(previous: Option<Artifact>) -> Self {
        Self {
            success: true,
            message: CACHED_MESSAGE.to_string(),
            produced_artifact: previous,
        }
    }

    /// Attaches a produced artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.produced_artifact = Some(artifact);
        self
    }

    /// Returns true if this output produced an artifact of `artifact_type`.
    #[must_use]
    pub fn produced(&self, artifact_type: ArtifactType) -> bool {
        self.produced_artifact
            .as_ref()
            .is_some_and(|a| a.artifact_type == artifact_type)
    }

    /// Returns true if this output is a successful result whose artifact was
    /// produced for `revision`.
    #[must_use]
    pub fn is_valid_for_revision(&self, revision: &str) -> bool {
        self.success
            && self
                .produced_artifact
                .as_ref()
                .is_some_and(|a| a.revision == revision)
    }

    /// Returns true if this output is a successful result whose artifact was
    /// produced from changes hashing to `hash`.
    #[must_use]
    pub fn is_valid_for_hash(&self, hash: &str) -> bool {
        self.success
            && self
                .produced_artifact
                .as_ref()
                .and_then(|a| a.hash.as_deref())
                .is_some_and(|h| h == hash)
    }
}
