//! Loading project descriptors from the repository.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{Dependencies, Project, Stages};
use crate::errors::MonoflowError;

/// On-disk shape of `deployment/project.json`.
#[derive(Debug, Deserialize)]
struct ProjectDescriptor {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "maintainer")]
    maintainers: Vec<String>,
    #[serde(default)]
    stages: Stages,
    #[serde(default)]
    dependencies: Dependencies,
}

/// Loads a single project.
///
/// `project_path` is relative to `root_dir` and becomes the project's
/// identity; the root of the project is derived from it.
pub fn load_project(root_dir: &Path, project_path: &str) -> Result<Project, MonoflowError> {
    let full_path = root_dir.join(project_path);
    let content = std::fs::read_to_string(&full_path).map_err(|e| MonoflowError::ProjectLoad {
        path: full_path.clone(),
        message: e.to_string(),
    })?;

    let descriptor: ProjectDescriptor =
        serde_json::from_str(&content).map_err(|e| MonoflowError::ProjectLoad {
            path: full_path.clone(),
            message: e.to_string(),
        })?;

    if descriptor.name.trim().is_empty() {
        return Err(MonoflowError::ProjectLoad {
            path: full_path,
            message: "project name must not be empty".to_string(),
        });
    }

    let mut project = Project::new(descriptor.name, project_path)
        .with_description(descriptor.description);
    project.maintainers = descriptor.maintainers;
    project.stages = descriptor.stages;
    project.dependencies = descriptor.dependencies;

    debug!(project = %project.name, path = %project.path, "Loaded project");
    Ok(project)
}

/// Loads every project in `paths`.
///
/// Fails on the first descriptor that cannot be loaded, after logging it.
pub fn load_projects<'a>(
    root_dir: &Path,
    paths: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<Project>, MonoflowError> {
    let mut projects = Vec::new();
    for path in paths {
        match load_project(root_dir, path) {
            Ok(project) => projects.push(project),
            Err(err) => {
                warn!(path = %path, error = %err, "Failed to load project");
                return Err(err);
            }
        }
    }
    projects.sort();
    Ok(projects)
}

/// Absolute location of a project's descriptor.
#[must_use]
pub fn descriptor_location(root_dir: &Path, project: &Project) -> PathBuf {
    root_dir.join(&project.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stage;

    fn write_descriptor(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_project() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(
            dir.path(),
            "apps/web/deployment/project.json",
            r#"{
                "name": "web",
                "description": "The web frontend",
                "maintainer": ["Frontend"],
                "stages": {"build": "Docker Build", "deploy": "Helm Deploy"},
                "dependencies": {"build": ["libs/ui"]}
            }"#,
        );

        let project = load_project(dir.path(), "apps/web/deployment/project.json").unwrap();

        assert_eq!(project.name, "web");
        assert_eq!(project.root_path, "apps/web");
        assert_eq!(project.maintainers, vec!["Frontend".to_string()]);
        assert_eq!(project.step_for(Stage::Build), Some("Docker Build"));
        assert!(project.dependencies.touches(Stage::Build, "libs/ui/button.ts"));
        assert!(!project.dependencies.touches(Stage::Deploy, "libs/ui/button.ts"));
    }

    #[test]
    fn test_load_missing_project() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_project(dir.path(), "nope/deployment/project.json").unwrap_err();
        assert!(matches!(err, MonoflowError::ProjectLoad { .. }));
    }

    #[test]
    fn test_load_invalid_project() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), "a/deployment/project.json", r#"{"name": ""}"#);
        assert!(load_project(dir.path(), "a/deployment/project.json").is_err());

        write_descriptor(dir.path(), "b/deployment/project.json", "not json");
        assert!(load_project(dir.path(), "b/deployment/project.json").is_err());
    }

    #[test]
    fn test_load_projects_sorted_by_path() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), "z/deployment/project.json", r#"{"name": "z"}"#);
        write_descriptor(dir.path(), "a/deployment/project.json", r#"{"name": "a"}"#);

        let projects = load_projects(
            dir.path(),
            ["z/deployment/project.json", "a/deployment/project.json"],
        )
        .unwrap();

        let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "z"]);
        assert!(descriptor_location(dir.path(), &projects[0]).exists());
    }
}
