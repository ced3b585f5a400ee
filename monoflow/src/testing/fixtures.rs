//! Test fixtures for projects, histories and run properties.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::changes::{ChangeStatus, Changeset};
use crate::config::{RunProperties, Target, VersioningProperties};
use crate::core::Stage;
use crate::errors::MonoflowError;
use crate::project::Project;

/// Builder for projects laid out as `apps/<name>/deployment/project.json`.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    project: Project,
}

impl ProjectFixture {
    /// Starts a project named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            project: Project::new(name, format!("apps/{name}/deployment/project.json")),
        }
    }

    /// Declares a step.
    #[must_use]
    pub fn step(mut self, stage: Stage, step_name: &str) -> Self {
        self.project = self.project.with_step(stage, step_name);
        self
    }

    /// Declares a dependency prefix.
    #[must_use]
    pub fn depends_on(mut self, stage: Stage, prefix: &str) -> Self {
        self.project = self.project.with_dependencies(stage, [prefix]);
        self
    }

    /// Adds a maintainer.
    #[must_use]
    pub fn maintainer(mut self, maintainer: &str) -> Self {
        self.project = self.project.with_maintainer(maintainer);
        self
    }

    /// Finishes the project.
    #[must_use]
    pub fn build(self) -> Project {
        self.project
    }
}

/// A changeset marking every file as modified.
#[must_use]
pub fn changeset(sha: &str, ord: u64, files: &[&str]) -> Changeset {
    Changeset::new(sha, ord, files.iter().map(|f| (*f, ChangeStatus::Modified)))
}

/// Pull request run properties for `revision`.
#[must_use]
pub fn run_properties(revision: &str) -> Arc<RunProperties> {
    Arc::new(RunProperties::new(
        "test-build",
        Target::PullRequest,
        VersioningProperties::new(revision).with_pr_number(1),
    ))
}

/// Writes a descriptor for `project` below `repo_root`, so it can be loaded
/// back with [`crate::project::load_project`].
pub fn write_project_descriptor(repo_root: &Path, project: &Project) -> Result<(), MonoflowError> {
    let path = repo_root.join(&project.path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let descriptor = serde_json::json!({
        "name": project.name,
        "description": project.description,
        "maintainers": project.maintainers,
        "stages": project.stages,
        "dependencies": project.dependencies,
    });
    fs::write(path, serde_json::to_string_pretty(&descriptor)?)?;
    Ok(())
}
