//! The version control collaborator.

use async_trait::async_trait;

use super::{sort_most_recent_first, Changeset};
use crate::errors::MonoflowError;

/// Facade over the version control system.
///
/// Histories are returned most-recent-first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Returns the descriptor paths of every project in the repository.
    async fn find_projects(&self) -> Result<Vec<String>, MonoflowError>;

    /// Changes on the current branch relative to the main branch.
    async fn changes_in_branch(&self) -> Result<Vec<Changeset>, MonoflowError>;

    /// Like [`ChangeSource::changes_in_branch`], plus uncommitted local changes.
    async fn changes_in_branch_including_local(&self) -> Result<Vec<Changeset>, MonoflowError>;

    /// Changes introduced by the commit a tag points at.
    async fn changes_in_tagged_commit(&self, tag: &str) -> Result<Vec<Changeset>, MonoflowError>;
}

/// A change source backed by a fixed history.
#[derive(Debug, Clone, Default)]
pub struct StaticChangeSource {
    projects: Vec<String>,
    history: Vec<Changeset>,
    local: Option<Changeset>,
}

impl StaticChangeSource {
    /// Creates a change source with the given projects and history.
    #[must_use]
    pub fn new(projects: Vec<String>, mut history: Vec<Changeset>) -> Self {
        sort_most_recent_first(&mut history);
        Self {
            projects,
            history,
            local: None,
        }
    }

    /// Sets the uncommitted local changes.
    #[must_use]
    pub fn with_local_changes(mut self, local: Changeset) -> Self {
        self.local = Some(local);
        self
    }
}

#[async_trait]
impl ChangeSource for StaticChangeSource {
    async fn find_projects(&self) -> Result<Vec<String>, MonoflowError> {
        Ok(self.projects.clone())
    }

    async fn changes_in_branch(&self) -> Result<Vec<Changeset>, MonoflowError> {
        Ok(self.history.clone())
    }

    async fn changes_in_branch_including_local(&self) -> Result<Vec<Changeset>, MonoflowError> {
        let mut history = self.history.clone();
        if let Some(local) = &self.local {
            history.insert(0, local.clone());
        }
        Ok(history)
    }

    async fn changes_in_tagged_commit(&self, tag: &str) -> Result<Vec<Changeset>, MonoflowError> {
        self.history
            .first()
            .cloned()
            .map(|head| vec![head])
            .ok_or_else(|| MonoflowError::ChangeSource(format!("No commit found for tag {tag}")))
    }
}
