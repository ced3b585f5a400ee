//! Top-level wiring of one build invocation.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::changes::{ChangeSource, Changeset};
use crate::config::RunProperties;
use crate::core::Stage;
use crate::discovery::{write_run_plan, Discovery, RunPlan};
use crate::errors::MonoflowError;
use crate::executor::{run_build, RunResult, StepsExecutor};
use crate::project::{load_projects, Project};
use crate::reporting::{format, Reporter, Reporters};
use crate::steps::StepRegistry;
use crate::store::{FileOutputStore, OutputStore};

/// Which changes drive discovery.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChangeSelection {
    /// Commits on the current branch.
    #[default]
    Branch,
    /// Commits on the current branch plus uncommitted changes.
    BranchIncludingLocal,
    /// The commit a tag points at.
    Tag(String),
}

/// Parameters of one invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Which changes drive discovery.
    pub changes: ChangeSelection,
    /// Plan every project regardless of changes.
    pub build_all: bool,
    /// Only run this stage.
    pub selected_stage: Option<Stage>,
    /// Only run these projects, by name.
    pub selected_projects: Option<Vec<String>>,
    /// Do not mutate external systems.
    pub dry_run: bool,
}

impl BuildRequest {
    /// Creates a request for the current branch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the change selection.
    #[must_use]
    pub fn with_changes(mut self, changes: ChangeSelection) -> Self {
        self.changes = changes;
        self
    }

    /// Plans every project.
    #[must_use]
    pub fn with_build_all(mut self, build_all: bool) -> Self {
        self.build_all = build_all;
        self
    }

    /// Restricts the run to one stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.selected_stage = Some(stage);
        self
    }

    /// Restricts the run to named projects.
    #[must_use]
    pub fn with_projects(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.selected_projects = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the dry run flag.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Runs build invocations against one repository checkout.
pub struct Orchestrator {
    repo_root: PathBuf,
    change_source: Arc<dyn ChangeSource>,
    store: Arc<dyn OutputStore>,
    registry: Arc<StepRegistry>,
    run_properties: Arc<RunProperties>,
    reporters: Reporters,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("repo_root", &self.repo_root)
            .field("registry", &self.registry)
            .field("reporters", &self.reporters)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator storing outputs in each project's metadata
    /// directory.
    #[must_use]
    pub fn new(
        repo_root: impl Into<PathBuf>,
        change_source: Arc<dyn ChangeSource>,
        registry: Arc<StepRegistry>,
        run_properties: Arc<RunProperties>,
    ) -> Self {
        let repo_root = repo_root.into();
        let store = Arc::new(FileOutputStore::new(
            repo_root.clone(),
            run_properties.config.build_metadata_dir.clone(),
        ));
        Self {
            repo_root,
            change_source,
            store,
            registry,
            run_properties,
            reporters: Reporters::new(),
        }
    }

    /// Replaces the output store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn OutputStore>) -> Self {
        self.store = store;
        self
    }

    /// Adds a reporting sink.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters = self.reporters.with_reporter(reporter);
        self
    }

    async fn history(&self, selection: &ChangeSelection) -> Result<Vec<Changeset>, MonoflowError> {
        match selection {
            ChangeSelection::Branch => self.change_source.changes_in_branch().await,
            ChangeSelection::BranchIncludingLocal => {
                self.change_source.changes_in_branch_including_local().await
            }
            ChangeSelection::Tag(tag) => self.change_source.changes_in_tagged_commit(tag).await,
        }
    }

    /// Loads the projects and computes the selected plan.
    pub async fn plan(&self, request: &BuildRequest) -> Result<RunPlan, MonoflowError> {
        let paths = self.change_source.find_projects().await?;
        let projects = load_projects(&self.repo_root, paths.iter().map(String::as_str))?;
        let history = if request.build_all {
            Vec::new()
        } else {
            self.history(&request.changes).await?
        };
        info!(
            projects = projects.len(),
            revisions = history.len(),
            build_all = request.build_all,
            "Discovering work"
        );

        let discovery = Discovery::new(Arc::clone(&self.store))
            .with_registry(Arc::clone(&self.registry))
            .with_repo_root(&self.repo_root);
        let mut plan = discovery.find_build_set(&projects, &history, request.build_all);

        if let Some(stage) = request.selected_stage {
            plan = plan.select_stage(stage);
        }
        if let Some(names) = &request.selected_projects {
            let selected = select_by_name(&projects, names)?;
            plan = plan.select_projects(selected);
        }
        Ok(plan)
    }

    /// Plans and executes one invocation.
    ///
    /// A step error does not fail this call; it is recorded on the returned
    /// result.
    pub async fn run(&self, request: BuildRequest) -> Result<RunResult, MonoflowError> {
        let plan = self.plan(&request).await?;
        write_run_plan(
            &plan,
            &self.repo_root.join(&self.run_properties.config.run_artifacts_dir),
        )?;
        info!("{}", format::run_plan_text(&plan).trim_end());

        let run_result = RunResult::new(Arc::clone(&self.run_properties), plan);
        if !run_result.has_run_plan_projects() {
            info!("Nothing to do");
            return Ok(run_result);
        }

        let executor = StepsExecutor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            Arc::clone(&self.run_properties),
        )
        .with_dry_run(request.dry_run);
        let run_result = run_build(run_result, &executor, &self.reporters).await;

        if run_result.is_success() {
            info!(status = %run_result.status_line(), "Run finished");
        } else {
            warn!(status = %run_result.status_line(), "Run finished");
        }
        Ok(run_result)
    }
}

fn select_by_name<'a>(projects: &'a [Project], names: &[String]) -> Result<Vec<&'a Project>, MonoflowError> {
    let unknown: Vec<&str> = names
        .iter()
        .filter(|name| !projects.iter().any(|p| &p.name == *name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(MonoflowError::Config(format!(
            "Unknown project(s): {}",
            unknown.join(", ")
        )));
    }
    Ok(projects
        .iter()
        .filter(|p| names.contains(&p.name))
        .collect())
}
