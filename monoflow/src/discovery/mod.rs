//! Incremental discovery of the work a change history requires.
//!
//! [`Discovery`] combines the project model, the artifact store and
//! (optionally) the step registry to turn a change history into a
//! [`RunPlan`].

mod execution;
mod invalidation;
mod plan;


use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::changes::Changeset;
use crate::core::Stage;
use crate::project::Project;
use crate::steps::StepRegistry;
use crate::store::OutputStore;

pub use execution::{hash_changes, ProjectExecution};
pub use invalidation::{invalidating_changes, invalidating_prefixes, relevant_changes};
pub use plan::{write_run_plan, RunPlan, RunPlanEntry, RunPlanStage, RUN_PLAN_FILE};

/// Computes invalidated projects and run plans.
#[derive(Clone)]
pub struct Discovery {
    store: Arc<dyn OutputStore>,
    registry: Option<Arc<StepRegistry>>,
    repo_root: Option<PathBuf>,
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("has_registry", &self.registry.is_some())
            .field("repo_root", &self.repo_root)
            .finish_non_exhaustive()
    }
}

impl Discovery {
    /// Creates a discovery without a step registry.
    ///
    /// Cross-stage dependency propagation needs the registry; without one only
    /// a project's own root and the dependencies declared for a stage
    /// invalidate it.
    #[must_use]
    pub fn new(store: Arc<dyn OutputStore>) -> Self {
        Self {
            store,
            registry: None,
            repo_root: None,
        }
    }

    /// Sets the step registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<StepRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the checkout whose file contents key cached executions.
    ///
    /// Without a repository root nothing is ever planned as cached.
    #[must_use]
    pub fn with_repo_root(mut self, repo_root: impl Into<PathBuf>) -> Self {
        self.repo_root = Some(repo_root.into());
        self
    }

    /// Returns the projects invalidated for `stage` by `history`.
    #[must_use]
    pub fn find_invalidated_projects(
        &self,
        all_projects: &[Project],
        stage: Stage,
        history: &[Changeset],
    ) -> BTreeSet<Project> {
        let history = most_recent_first(history);
        self.plan_stage(all_projects, stage, &history)
            .into_iter()
            .map(|execution| execution.project)
            .collect()
    }

    /// Builds the run plan for every stage.
    ///
    /// With `build_all` every project is planned for each stage it takes part
    /// in, bypassing invalidation.
    #[must_use]
    pub fn find_build_set(
        &self,
        all_projects: &[Project],
        history: &[Changeset],
        build_all: bool,
    ) -> RunPlan {
        let history = most_recent_first(history);
        let mut plan = BTreeMap::new();

        for stage in Stage::ALL {
            let executions: BTreeSet<ProjectExecution> = if build_all {
                all_projects
                    .iter()
                    .filter(|p| p.participates_in(stage))
                    .map(|p| ProjectExecution::create(p.clone()))
                    .collect()
            } else {
                self.plan_stage(all_projects, stage, &history)
            };
            info!(
                stage = %stage,
                planned = executions.len(),
                cached = executions.iter().filter(|e| e.cached).count(),
                "Planned stage"
            );
            plan.insert(stage, executions);
        }

        RunPlan::from_plan(plan)
    }

    fn plan_stage(
        &self,
        all_projects: &[Project],
        stage: Stage,
        history: &[&Changeset],
    ) -> BTreeSet<ProjectExecution> {
        if self.registry.is_none() {
            debug!(
                stage = %stage,
                "No step registry, cross-stage dependencies are not considered"
            );
        }
        all_projects
            .iter()
            .filter(|project| project.participates_in(stage))
            .filter_map(|project| self.plan_project(project, stage, history))
            .collect()
    }

    fn plan_project(
        &self,
        project: &Project,
        stage: Stage,
        history: &[&Changeset],
    ) -> Option<ProjectExecution> {
        let stored = self.store.read(project, stage);
        let relevant = relevant_changes(stored.as_ref(), history);
        if relevant.is_empty() {
            return None;
        }

        let prefixes = invalidating_prefixes(project, stage, self.registry.as_deref());
        let invalidating = invalidating_changes(relevant, &prefixes);
        if invalidating.is_empty() {
            return None;
        }

        let mut execution = ProjectExecution::with_changes(project.clone(), invalidating);
        if let Some(repo_root) = &self.repo_root {
            execution = execution.hashed_under(repo_root);
        }
        let cached = stage.is_cacheable()
            && match (&stored, &execution.hashed_changes) {
                (Some(output), Some(hash)) => output.is_valid_for_hash(hash),
                _ => false,
            };
        debug!(
            project = %project.name,
            stage = %stage,
            changes = execution.changed_files.len(),
            cached,
            "Project invalidated"
        );
        Some(execution.cached(cached))
    }
}

fn most_recent_first(history: &[Changeset]) -> Vec<&Changeset> {
    let mut sorted: Vec<&Changeset> = history.iter().collect();
    sorted.sort_by(|a, b| b.ord.cmp(&a.ord));
    sorted
}
