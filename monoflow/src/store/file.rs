//! JSON files inside each project's metadata directory.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::OutputStore;
use crate::core::{Output, Stage};
use crate::errors::MonoflowError;
use crate::project::Project;

/// Stores outputs at `<repo>/<project root>/<metadata dir>/<stage>.json`.
#[derive(Debug, Clone)]
pub struct FileOutputStore {
    repo_root: PathBuf,
    metadata_dir: String,
}

impl FileOutputStore {
    /// Creates a store rooted at the repository checkout.
    #[must_use]
    pub fn new(repo_root: impl Into<PathBuf>, metadata_dir: impl Into<String>) -> Self {
        Self {
            repo_root: repo_root.into(),
            metadata_dir: metadata_dir.into(),
        }
    }

    /// Returns the repository root.
    #[must_use]
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Location of the output file for a project and stage.
    #[must_use]
    pub fn output_path(&self, project: &Project, stage: Stage) -> PathBuf {
        self.repo_root
            .join(project.target_path(&self.metadata_dir))
            .join(format!("{}.json", stage.as_str()))
    }
}

impl OutputStore for FileOutputStore {
    fn read(&self, project: &Project, stage: Stage) -> Option<Output> {
        let path = self.output_path(project, stage);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read stored output");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(output) => Some(output),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt stored output");
                None
            }
        }
    }

    fn write(&self, project: &Project, stage: Stage, output: &Output) -> Result<(), MonoflowError> {
        let path = self.output_path(project, stage);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(output)?)?;
        debug!(
            project = %project.name,
            stage = %stage,
            path = %path.display(),
            "Persisted step output"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Artifact, ArtifactType};
    use pretty_assertions::assert_eq;

    fn project() -> Project {
        Project::new("a", "apps/a/deployment/project.json")
    }

    #[test]
    fn test_output_path_layout() {
        let store = FileOutputStore::new("/repo", ".monoflow");
        assert_eq!(
            store.output_path(&project(), Stage::PostDeploy),
            PathBuf::from("/repo/apps/a/.monoflow/postdeploy.json")
        );
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileOutputStore::new(dir.path(), ".monoflow");
        let output = Output::success("built").with_artifact(
            Artifact::new(
                ArtifactType::DockerImage,
                "r1",
                "Docker Build",
                serde_json::json!({"image": "app:1"}),
            )
            .with_hash("abc"),
        );

        store.write(&project(), Stage::Build, &output).unwrap();

        assert!(dir.path().join("apps/a/.monoflow/build.json").exists());
        assert_eq!(store.read(&project(), Stage::Build), Some(output));
    }

    #[test]
    fn test_missing_and_corrupt_read_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileOutputStore::new(dir.path(), ".monoflow");
        assert!(store.read(&project(), Stage::Test).is_none());

        let path = store.output_path(&project(), Stage::Test);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(store.read(&project(), Stage::Test).is_none());
    }
}
