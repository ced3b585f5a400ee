//! A project scheduled for one stage of one invocation.

use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

use crate::changes::ChangeStatus;
use crate::project::Project;

/// A project planned for a stage, with its cache decision.
///
/// Equality and ordering follow the project path, so a stage holds at most
/// one execution per project.
#[derive(Debug, Clone)]
pub struct ProjectExecution {
    /// The project to execute.
    pub project: Project,
    /// Opaque key, unique per execution.
    pub cache_key: String,
    /// Relevant changes that invalidated the project.
    pub changed_files: BTreeMap<String, ChangeStatus>,
    /// Content hash of `changed_files`; `None` when it could not be computed
    /// or the execution was not driven by changes.
    pub hashed_changes: Option<String>,
    /// The executor may skip real work and report the last known success.
    pub cached: bool,
}

impl ProjectExecution {
    /// Creates an uncached execution that is not tied to specific changes.
    #[must_use]
    pub fn create(project: Project) -> Self {
        Self {
            project,
            cache_key: Uuid::new_v4().to_string(),
            changed_files: BTreeMap::new(),
            hashed_changes: None,
            cached: false,
        }
    }

    /// Creates an execution driven by the given invalidating changes.
    #[must_use]
    pub fn with_changes(project: Project, changed_files: BTreeMap<String, ChangeStatus>) -> Self {
        Self {
            project,
            cache_key: Uuid::new_v4().to_string(),
            changed_files,
            hashed_changes: None,
            cached: false,
        }
    }

    /// Hashes the current contents of `changed_files` under `repo_root`.
    #[must_use]
    pub fn hashed_under(mut self, repo_root: &Path) -> Self {
        self.hashed_changes = hash_changes(repo_root, &self.changed_files);
        self
    }

    /// Sets the cache decision.
    #[must_use]
    pub fn cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    /// The project's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.project.name
    }
}

const DELETED_MARKER: &str = "<deleted>";

/// SHA-256 over sorted `path:status:content-digest` lines.
///
/// Contents are read relative to `repo_root`; deleted or absent files hash
/// as a fixed marker. Returns `None` for no changes, or when a file exists but
/// cannot be read.
#[must_use]
pub fn hash_changes(repo_root: &Path, changed_files: &BTreeMap<String, ChangeStatus>) -> Option<String> {
    if changed_files.is_empty() {
        return None;
    }
    let mut hasher = Sha256::new();
    for (path, status) in changed_files {
        let digest = match content_digest(repo_root, path, *status) {
            Ok(digest) => digest,
            Err(err) => {
                warn!(path = %path, error = %err, "Cannot hash changed file, caching disabled");
                return None;
            }
        };
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(status.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }
    Some(hex::encode(hasher.finalize()))
}

fn content_digest(repo_root: &Path, path: &str, status: ChangeStatus) -> io::Result<String> {
    if status == ChangeStatus::Deleted {
        return Ok(DELETED_MARKER.to_string());
    }
    match std::fs::read(repo_root.join(path)) {
        Ok(content) => Ok(hex::encode(Sha256::digest(&content))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(DELETED_MARKER.to_string()),
        Err(err) => Err(err),
    }
}

impl PartialEq for ProjectExecution {
    fn eq(&self, other: &Self) -> bool {
        self.project == other.project
    }
}

impl Eq for ProjectExecution {}

impl PartialOrd for ProjectExecution {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProjectExecution {
    fn cmp(&self, other: &Self) -> Ordering {
        self.project.cmp(&other.project)
    }
}
