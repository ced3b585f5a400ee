//! The stage to project-execution mapping of one invocation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::ProjectExecution;
use crate::core::Stage;
use crate::errors::MonoflowError;
use crate::project::Project;

/// File name of the written run plan summary.
pub const RUN_PLAN_FILE: &str = "run_plan.json";

/// Planned executions per stage, with an optional selection view.
///
/// Selecting a stage or a project subset never mutates the full plan; every
/// query through the selected view filters on the fly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    full_plan: BTreeMap<Stage, BTreeSet<ProjectExecution>>,
    selected_stage: Option<Stage>,
    selected_projects: Option<BTreeSet<String>>,
}

impl RunPlan {
    /// Creates a plan with nothing to do.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates an unselected plan.
    #[must_use]
    pub fn from_plan(full_plan: BTreeMap<Stage, BTreeSet<ProjectExecution>>) -> Self {
        Self {
            full_plan,
            selected_stage: None,
            selected_projects: None,
        }
    }

    /// Narrows the view to one stage.
    #[must_use]
    pub fn select_stage(mut self, stage: Stage) -> Self {
        self.selected_stage = Some(stage);
        self
    }

    /// Narrows the view to the given projects.
    #[must_use]
    pub fn select_projects<'a>(mut self, projects: impl IntoIterator<Item = &'a Project>) -> Self {
        self.selected_projects = Some(projects.into_iter().map(|p| p.path.clone()).collect());
        self
    }

    /// Returns the stage selection.
    #[must_use]
    pub const fn selected_stage(&self) -> Option<Stage> {
        self.selected_stage
    }

    /// The full plan, ignoring any selection.
    #[must_use]
    pub const fn full_plan(&self) -> &BTreeMap<Stage, BTreeSet<ProjectExecution>> {
        &self.full_plan
    }

    fn is_selected(&self, stage: Stage, execution: &ProjectExecution) -> bool {
        self.selected_stage.map_or(true, |s| s == stage)
            && self
                .selected_projects
                .as_ref()
                .map_or(true, |paths| paths.contains(&execution.project.path))
    }

    /// The plan as seen through the current selection.
    #[must_use]
    pub fn selected_plan(&self) -> BTreeMap<Stage, Vec<&ProjectExecution>> {
        self.full_plan
            .iter()
            .map(|(stage, executions)| {
                let selected = executions
                    .iter()
                    .filter(|e| self.is_selected(*stage, e))
                    .collect::<Vec<_>>();
                (*stage, selected)
            })
            .filter(|(_, executions)| !executions.is_empty())
            .collect()
    }

    /// Returns true if any execution would run.
    ///
    /// Cached executions only count with `include_cached`. With
    /// `use_full_plan` the selection is ignored.
    #[must_use]
    pub fn has_projects_to_run(&self, include_cached: bool, use_full_plan: bool) -> bool {
        self.full_plan.iter().any(|(stage, executions)| {
            executions.iter().any(|e| {
                (include_cached || !e.cached) && (use_full_plan || self.is_selected(*stage, e))
            })
        })
    }

    /// Every selected project across all stages.
    #[must_use]
    pub fn get_all_projects(&self) -> BTreeSet<&Project> {
        self.selected_plan()
            .into_values()
            .flatten()
            .map(|e| &e.project)
            .collect()
    }

    /// Selected executions for a stage, in project order.
    #[must_use]
    pub fn get_projects_for_stage(&self, stage: Stage) -> Vec<&ProjectExecution> {
        self.full_plan
            .get(&stage)
            .map(|executions| {
                executions
                    .iter()
                    .filter(|e| self.is_selected(stage, e))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Like [`RunPlan::get_projects_for_stage`], by stage name. Unknown names
    /// yield nothing.
    #[must_use]
    pub fn get_projects_for_stage_name(&self, stage_name: &str) -> Vec<&ProjectExecution> {
        stage_name
            .parse::<Stage>()
            .map(|stage| self.get_projects_for_stage(stage))
            .unwrap_or_default()
    }

    /// Per-project summary of the selected plan.
    #[must_use]
    pub fn summary(&self) -> Vec<RunPlanEntry> {
        let mut entries: BTreeMap<&str, RunPlanEntry> = BTreeMap::new();
        for (stage, executions) in self.selected_plan() {
            for execution in executions {
                let project = &execution.project;
                entries
                    .entry(project.path.as_str())
                    .or_insert_with(|| RunPlanEntry {
                        service: project.name.clone(),
                        path: project.path.clone(),
                        base_path: project.root_path.clone(),
                        maintainers: project.maintainers.clone(),
                        stages: Vec::new(),
                    })
                    .stages
                    .push(RunPlanStage {
                        name: stage,
                        cached: execution.cached,
                    });
            }
        }
        entries.into_values().collect()
    }
}

/// Summary of one project's planned stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlanEntry {
    /// Project name.
    pub service: String,
    /// Descriptor path.
    pub path: String,
    /// Project root.
    pub base_path: String,
    /// Project maintainers.
    pub maintainers: Vec<String>,
    /// Planned stages in pipeline order.
    pub stages: Vec<RunPlanStage>,
}

/// One planned stage of a [`RunPlanEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlanStage {
    /// The stage.
    pub name: Stage,
    /// Whether the execution is cached.
    pub cached: bool,
}

/// Writes the plan summary to `<dir>/run_plan.json`.
pub fn write_run_plan(plan: &RunPlan, dir: &Path) -> Result<PathBuf, MonoflowError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(RUN_PLAN_FILE);
    fs::write(&path, serde_json::to_string_pretty(&plan.summary())?)?;
    info!(path = %path.display(), "Wrote run plan");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn project(name: &str) -> Project {
        Project::new(name, format!("apps/{name}/deployment/project.json")).with_maintainer("Team")
    }

    fn plan() -> RunPlan {
        let a = project("a");
        let b = project("b");
        let mut full = BTreeMap::new();
        full.insert(
            Stage::Build,
            BTreeSet::from([
                ProjectExecution::create(a.clone()),
                ProjectExecution::create(b.clone()).cached(true),
            ]),
        );
        full.insert(Stage::Deploy, BTreeSet::from([ProjectExecution::create(a)]));
        full.insert(Stage::Test, BTreeSet::new());
        RunPlan::from_plan(full)
    }

    #[test]
    fn test_selection_is_a_view() {
        let plan = plan().select_stage(Stage::Deploy);
        assert_eq!(plan.get_projects_for_stage(Stage::Build).len(), 0);
        assert_eq!(plan.get_projects_for_stage(Stage::Deploy).len(), 1);
        assert_eq!(plan.full_plan()[&Stage::Build].len(), 2);

        let b = project("b");
        let plan = plan.select_stage(Stage::Build).select_projects([&b]);
        let names: Vec<_> = plan
            .get_projects_for_stage(Stage::Build)
            .iter()
            .map(|e| e.name())
            .collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_has_projects_to_run() {
        let plan = plan();
        assert!(plan.has_projects_to_run(false, false));

        let b = project("b");
        let only_cached = plan.select_projects([&b]);
        assert!(!only_cached.has_projects_to_run(false, false));
        assert!(only_cached.has_projects_to_run(true, false));
        assert!(only_cached.has_projects_to_run(false, true));

        assert!(!RunPlan::empty().has_projects_to_run(true, true));
    }

    #[test]
    fn test_stage_name_lookup_and_all_projects() {
        let plan = plan();
        assert_eq!(plan.get_projects_for_stage_name("build").len(), 2);
        assert!(plan.get_projects_for_stage_name("bogus").is_empty());
        assert_eq!(plan.get_all_projects().len(), 2);
        assert_eq!(plan.selected_plan().len(), 2);
    }

    #[test]
    fn test_summary() {
        let summary = plan().summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].service, "a");
        assert_eq!(summary[0].base_path, "apps/a");
        assert_eq!(
            summary[0].stages,
            vec![
                RunPlanStage { name: Stage::Build, cached: false },
                RunPlanStage { name: Stage::Deploy, cached: false },
            ]
        );
        assert_eq!(summary[1].stages, vec![RunPlanStage { name: Stage::Build, cached: true }]);
    }

    #[test]
    fn test_write_run_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_run_plan(&plan(), &dir.path().join(".monoflow")).unwrap();

        let written: Vec<RunPlanEntry> =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, plan().summary());
    }
}
