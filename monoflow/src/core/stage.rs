//! Pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A phase of the pipeline.
///
/// Stages are totally ordered: a project whose `Build` failed within an
/// invocation never reaches `Test` or `Deploy` in that same invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Compile and package sources into an artifact.
    Build,
    /// Run the project's test suites.
    Test,
    /// Roll the built artifact out to a target environment.
    Deploy,
    /// Verification that runs against a deployed application.
    #[serde(rename = "postdeploy")]
    PostDeploy,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Self; 4] = [Self::Build, Self::Test, Self::Deploy, Self::PostDeploy];

    /// Returns the configuration name of the stage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
            Self::Deploy => "deploy",
            Self::PostDeploy => "postdeploy",
        }
    }

    /// Returns an icon used in human-readable reports.
    #[must_use]
    pub const fn icon(&self) -> &'static str {
        match self {
            Self::Build => "🏗️",
            Self::Test => "📋",
            Self::Deploy => "🚀",
            Self::PostDeploy => "🦺",
        }
    }

    /// Returns true if a previous result for this stage may be reused when the
    /// inputs that produced it have not changed.
    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        matches!(self, Self::Build | Self::Test)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown stage name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown stage: {0}")]
pub struct UnknownStageError(pub String);

impl FromStr for Stage {
    type Err = UnknownStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "build" => Ok(Self::Build),
            "test" => Ok(Self::Test),
            "deploy" => Ok(Self::Deploy),
            "postdeploy" | "post-deploy" | "post_deploy" => Ok(Self::PostDeploy),
            _ => Err(UnknownStageError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(Stage::Build < Stage::Test);
        assert!(Stage::Test < Stage::Deploy);
        assert!(Stage::Deploy < Stage::PostDeploy);

        let mut sorted = Stage::ALL.to_vec();
        sorted.reverse();
        sorted.sort();
        assert_eq!(sorted, Stage::ALL.to_vec());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Build.to_string(), "build");
        assert_eq!(Stage::PostDeploy.to_string(), "postdeploy");
    }

    #[test]
    fn test_stage_from_str() {
        assert_eq!("deploy".parse::<Stage>(), Ok(Stage::Deploy));
        assert_eq!("Post-Deploy".parse::<Stage>(), Ok(Stage::PostDeploy));
        assert!("lint".parse::<Stage>().is_err());
    }

    #[test]
    fn test_stage_serialize() {
        let json = serde_json::to_string(&Stage::PostDeploy).unwrap();
        assert_eq!(json, r#""postdeploy""#);

        let stage: Stage = serde_json::from_str(r#""test""#).unwrap();
        assert_eq!(stage, Stage::Test);
    }

    #[test]
    fn test_cacheable_stages() {
        assert!(Stage::Build.is_cacheable());
        assert!(Stage::Test.is_cacheable());
        assert!(!Stage::Deploy.is_cacheable());
        assert!(!Stage::PostDeploy.is_cacheable());
    }
}
