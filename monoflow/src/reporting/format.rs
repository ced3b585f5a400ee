//! Plain text renderings of plans and results.

use std::fmt::Write;

use crate::core::Stage;
use crate::discovery::RunPlan;
use crate::executor::RunResult;

/// Renders the run result, one section per stage that produced results.
#[must_use]
pub fn to_text(result: &RunResult) -> String {
    let mut text = format!("{}\n", result.status_line());
    if let Some(exception) = result.exception() {
        let _ = writeln!(text, "{exception}");
    }
    for stage in Stage::ALL {
        let results = result.results_for_stage(stage);
        if results.is_empty() {
            continue;
        }
        let _ = writeln!(text, "Stage {} {}", stage.icon(), stage);
        for step in results {
            let _ = writeln!(
                text,
                "{} - {} - success: {} - {}",
                step.timestamp.format("%H:%M:%S"),
                step.project.name,
                step.output.success,
                step.output.message
            );
        }
    }
    text
}

/// Lists the selected plan, marking cached executions.
#[must_use]
pub fn run_plan_text(plan: &RunPlan) -> String {
    let selected = plan.selected_plan();
    if selected.is_empty() {
        return "Execution plan: nothing to do\n".to_string();
    }
    let mut text = String::from("Execution plan:\n");
    for (stage, executions) in selected {
        let names: Vec<String> = executions
            .iter()
            .map(|e| {
                if e.cached {
                    format!("{} (cached)", e.name())
                } else {
                    e.name().to_string()
                }
            })
            .collect();
        let _ = writeln!(text, "  {stage}: {}", names.join(", "));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Output;
    use crate::discovery::ProjectExecution;
    use crate::errors::ExecutionException;
    use crate::executor::StepResult;
    use crate::testing::{run_properties, ProjectFixture};
    use std::collections::{BTreeMap, BTreeSet};

    fn plan() -> RunPlan {
        let a = ProjectFixture::new("a").build();
        let b = ProjectFixture::new("b").build();
        let mut full = BTreeMap::new();
        full.insert(
            Stage::Build,
            BTreeSet::from([
                ProjectExecution::create(a.clone()),
                ProjectExecution::create(b).cached(true),
            ]),
        );
        full.insert(Stage::Deploy, BTreeSet::from([ProjectExecution::create(a)]));
        RunPlan::from_plan(full)
    }

    #[test]
    fn test_run_plan_text() {
        assert_eq!(
            run_plan_text(&plan()),
            "Execution plan:\n  build: a, b (cached)\n  deploy: a\n"
        );
        assert_eq!(run_plan_text(&RunPlan::empty()), "Execution plan: nothing to do\n");
    }

    #[test]
    fn test_to_text() {
        let a = ProjectFixture::new("a").build();
        let mut result = RunResult::new(run_properties("r1"), plan());
        result.append(StepResult::new(Stage::Build, a, Output::success("built")));
        result.set_exception(ExecutionException::new("b", "Docker Build", Stage::Build, "boom"));

        let text = to_text(&result);
        assert!(text.starts_with("Failed with exception\n"));
        assert!(text.contains("Execution of 'Docker Build' for project 'b'"));
        assert!(text.contains("Stage"));
        assert!(text.contains(" - a - success: true - built"));
        assert!(!text.contains("deploy"));
    }
}
