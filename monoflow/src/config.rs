//! Configuration types for an invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::errors::MonoflowError;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `monoflow=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Global configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonoflowConfig {
    /// Directory, relative to each project root, holding persisted outputs.
    #[serde(default = "default_metadata_dir")]
    pub build_metadata_dir: String,
    /// Repository level directory for run artifacts such as the run plan.
    #[serde(default = "default_run_artifacts_dir")]
    pub run_artifacts_dir: String,
    /// When set, every maintainer of an executed project must be listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_maintainers: Option<Vec<String>>,
    /// Worker count for parallel command execution.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_metadata_dir() -> String {
    ".monoflow".to_string()
}

fn default_run_artifacts_dir() -> String {
    ".monoflow".to_string()
}

fn default_parallelism() -> usize {
    4
}

impl Default for MonoflowConfig {
    fn default() -> Self {
        Self {
            build_metadata_dir: default_metadata_dir(),
            run_artifacts_dir: default_run_artifacts_dir(),
            allowed_maintainers: None,
            parallelism: default_parallelism(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MonoflowConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, MonoflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MonoflowError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Sets the metadata directory.
    #[must_use]
    pub fn with_build_metadata_dir(mut self, dir: impl Into<String>) -> Self {
        self.build_metadata_dir = dir.into();
        self
    }

    /// Restricts executed projects to the given maintainers.
    #[must_use]
    pub fn with_allowed_maintainers(
        mut self,
        maintainers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.allowed_maintainers = Some(maintainers.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the parallel worker count.
    #[must_use]
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers;
        self
    }

    /// Applies `MONOFLOW_LOG_LEVEL` and `MONOFLOW_PARALLELISM` overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), MonoflowError> {
        if let Ok(level) = std::env::var("MONOFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(workers) = std::env::var("MONOFLOW_PARALLELISM") {
            self.parallelism = workers.parse().map_err(|_| {
                MonoflowError::Config(format!("MONOFLOW_PARALLELISM is not a number: {workers}"))
            })?;
        }
        self.validate()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), MonoflowError> {
        if self.build_metadata_dir.trim().is_empty() {
            return Err(MonoflowError::Config(
                "build_metadata_dir must not be empty".to_string(),
            ));
        }
        if self.parallelism == 0 {
            return Err(MonoflowError::Config(
                "parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The environment a run deploys to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Target {
    /// A pull request environment.
    #[default]
    PullRequest,
    /// The shared test environment built from the main branch.
    PullRequestBase,
    /// Acceptance.
    Acceptance,
    /// Production.
    Production,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PullRequest => "PullRequest",
            Self::PullRequestBase => "PullRequestBase",
            Self::Acceptance => "Acceptance",
            Self::Production => "Production",
        };
        f.write_str(name)
    }
}

/// Versioning information of the revision being built.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersioningProperties {
    /// The revision (commit sha) being built.
    pub revision: String,
    /// The branch, if any.
    #[serde(default)]
    pub branch: Option<String>,
    /// The pull request number, if any.
    #[serde(default)]
    pub pr_number: Option<u64>,
    /// The tag, if any.
    #[serde(default)]
    pub tag: Option<String>,
}

impl VersioningProperties {
    /// Creates versioning properties for a revision.
    #[must_use]
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            ..Self::default()
        }
    }

    /// Sets the pull request number.
    #[must_use]
    pub fn with_pr_number(mut self, pr_number: u64) -> Self {
        self.pr_number = Some(pr_number);
        self
    }

    /// Sets the tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Identifier used to tag produced artifacts: `pr-<n>` or the tag.
    #[must_use]
    pub fn identifier(&self) -> Option<String> {
        self.pr_number
            .map(|n| format!("pr-{n}"))
            .or_else(|| self.tag.clone())
    }
}

/// Run specific configuration handed to every step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunProperties {
    /// Uniquely identifies the run.
    pub build_id: String,
    /// The deploy target.
    pub target: Target,
    /// Versioning information.
    pub versioning: VersioningProperties,
    /// Global configuration.
    #[serde(default)]
    pub config: MonoflowConfig,
}

impl RunProperties {
    /// Creates run properties.
    #[must_use]
    pub fn new(build_id: impl Into<String>, target: Target, versioning: VersioningProperties) -> Self {
        Self {
            build_id: build_id.into(),
            target,
            versioning,
            config: MonoflowConfig::default(),
        }
    }

    /// Sets the global configuration.
    #[must_use]
    pub fn with_config(mut self, config: MonoflowConfig) -> Self {
        self.config = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = MonoflowConfig::from_json_str("{}").unwrap();
        assert_eq!(config, MonoflowConfig::default());
        assert_eq!(config.build_metadata_dir, ".monoflow");
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_json() {
        let config = MonoflowConfig::from_json_str(
            r#"{"allowed_maintainers": ["Team A"], "logging": {"json": true}}"#,
        )
        .unwrap();

        assert_eq!(config.allowed_maintainers, Some(vec!["Team A".to_string()]));
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation() {
        assert!(MonoflowConfig::from_json_str(r#"{"parallelism": 0}"#).is_err());
        assert!(MonoflowConfig::from_json_str(r#"{"build_metadata_dir": " "}"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monoflow.json");
        std::fs::write(&path, r#"{"parallelism": 2}"#).unwrap();

        let config = MonoflowConfig::from_file(&path).unwrap();
        assert_eq!(config.parallelism, 2);
    }

    #[test]
    fn test_versioning_identifier() {
        let pr = VersioningProperties::new("abc").with_pr_number(42);
        assert_eq!(pr.identifier(), Some("pr-42".to_string()));

        let tagged = VersioningProperties::new("abc").with_tag("v1.2.0");
        assert_eq!(tagged.identifier(), Some("v1.2.0".to_string()));

        assert_eq!(VersioningProperties::new("abc").identifier(), None);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::PullRequestBase.to_string(), "PullRequestBase");
    }
}
