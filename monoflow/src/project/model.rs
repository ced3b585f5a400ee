//! Static project description.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::core::Stage;

/// File name of a project descriptor.
pub const PROJECT_DESCRIPTOR: &str = "project.json";

/// Per-stage step names. A project without a step for a stage does not take
/// part in that stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stages {
    /// Step used for [`Stage::Build`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Step used for [`Stage::Test`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// Step used for [`Stage::Deploy`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<String>,
    /// Step used for [`Stage::PostDeploy`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postdeploy: Option<String>,
}

impl Stages {
    /// Returns the step name declared for `stage`.
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Build => self.build.as_deref(),
            Stage::Test => self.test.as_deref(),
            Stage::Deploy => self.deploy.as_deref(),
            Stage::PostDeploy => self.postdeploy.as_deref(),
        }
    }

    fn slot_mut(&mut self, stage: Stage) -> &mut Option<String> {
        match stage {
            Stage::Build => &mut self.build,
            Stage::Test => &mut self.test,
            Stage::Deploy => &mut self.deploy,
            Stage::PostDeploy => &mut self.postdeploy,
        }
    }

    /// Declares the step for `stage`.
    pub fn set(&mut self, stage: Stage, step_name: impl Into<String>) {
        *self.slot_mut(stage) = Some(step_name.into());
    }
}

/// Per-stage dependency path prefixes.
///
/// Files under these prefixes invalidate the project for the stage even though
/// they live outside the project's own root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Prefixes for [`Stage::Build`].
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub build: BTreeSet<String>,
    /// Prefixes for [`Stage::Test`].
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub test: BTreeSet<String>,
    /// Prefixes for [`Stage::Deploy`].
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub deploy: BTreeSet<String>,
    /// Prefixes for [`Stage::PostDeploy`].
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub postdeploy: BTreeSet<String>,
}

impl Dependencies {
    /// Returns the prefixes declared for `stage`.
    #[must_use]
    pub const fn for_stage(&self, stage: Stage) -> &BTreeSet<String> {
        match stage {
            Stage::Build => &self.build,
            Stage::Test => &self.test,
            Stage::Deploy => &self.deploy,
            Stage::PostDeploy => &self.postdeploy,
        }
    }

    /// Adds prefixes for `stage`.
    pub fn extend(&mut self, stage: Stage, prefixes: impl IntoIterator<Item = impl Into<String>>) {
        let set = match stage {
            Stage::Build => &mut self.build,
            Stage::Test => &mut self.test,
            Stage::Deploy => &mut self.deploy,
            Stage::PostDeploy => &mut self.postdeploy,
        };
        set.extend(prefixes.into_iter().map(Into::into));
    }

    /// Returns true if `path` lies under one of the prefixes for `stage`.
    #[must_use]
    pub fn touches(&self, stage: Stage, path: &str) -> bool {
        self.for_stage(stage).iter().any(|prefix| matches_prefix(path, prefix))
    }
}

/// Returns true if `path` starts with `prefix`.
///
/// The match is textual, so `libs/shared` also covers `libs/shared-utils/x.py`.
/// An empty prefix or `.` covers every path.
#[must_use]
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    prefix.is_empty() || prefix == "." || path.starts_with(prefix)
}

/// Derives the project root from the descriptor path.
///
/// `services/api/deployment/project.json` has root `services/api`; any other
/// path is its own root.
#[must_use]
pub fn project_root_dir(project_path: &str) -> String {
    let path = Path::new(project_path);
    if path.file_name().is_some_and(|name| name == PROJECT_DESCRIPTOR) {
        if let Some(root) = path.parent().and_then(Path::parent) {
            return root.to_string_lossy().into_owned();
        }
    }
    project_path.trim_end_matches('/').to_string()
}

/// A unit of source code with its own pipeline configuration.
///
/// Equality, hashing and ordering are defined by `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique name.
    pub name: String,
    /// Free text description.
    #[serde(default)]
    pub description: String,
    /// Unique path of the project (its descriptor), relative to the repo root.
    pub path: String,
    /// Directory under which the project's own files live.
    pub root_path: String,
    /// Owning teams or people.
    #[serde(default)]
    pub maintainers: Vec<String>,
    /// Step assignment per stage.
    #[serde(default)]
    pub stages: Stages,
    /// Dependency prefixes per stage.
    #[serde(default)]
    pub dependencies: Dependencies,
}

impl Project {
    /// Creates a project without steps or dependencies.
    ///
    /// The root is derived from `path`; see [`project_root_dir`].
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            description: String::new(),
            root_path: project_root_dir(&path),
            path,
            maintainers: Vec::new(),
            stages: Stages::default(),
            dependencies: Dependencies::default(),
        }
    }

    /// Overrides the root path.
    #[must_use]
    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declares the step for a stage.
    #[must_use]
    pub fn with_step(mut self, stage: Stage, step_name: impl Into<String>) -> Self {
        self.stages.set(stage, step_name);
        self
    }

    /// Declares dependency prefixes for a stage.
    #[must_use]
    pub fn with_dependencies(
        mut self,
        stage: Stage,
        prefixes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.dependencies.extend(stage, prefixes);
        self
    }

    /// Adds a maintainer.
    #[must_use]
    pub fn with_maintainer(mut self, maintainer: impl Into<String>) -> Self {
        self.maintainers.push(maintainer.into());
        self
    }

    /// Returns the step declared for `stage`.
    #[must_use]
    pub fn step_for(&self, stage: Stage) -> Option<&str> {
        self.stages.for_stage(stage)
    }

    /// Returns true if the project takes part in `stage`.
    #[must_use]
    pub fn participates_in(&self, stage: Stage) -> bool {
        self.step_for(stage).is_some()
    }

    /// Returns true if `path` lies under the project's own root.
    #[must_use]
    pub fn owns(&self, path: &str) -> bool {
        matches_prefix(path, &self.root_path)
    }

    /// Directory holding the project's persisted outputs.
    #[must_use]
    pub fn target_path(&self, metadata_dir: &str) -> String {
        if self.root_path.is_empty() {
            metadata_dir.to_string()
        } else {
            format!("{}/{}", self.root_path, metadata_dir)
        }
    }
}

impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Project {}

impl Hash for Project {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl PartialOrd for Project {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Project {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}
