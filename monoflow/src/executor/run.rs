//! Driving a plan through the stages.

use tracing::{error, info, warn};

use super::{RunResult, StepResult, StepsExecutor};
use crate::core::Stage;
use crate::reporting::Reporters;

/// Executes the plan held by `run_result`, stage by stage.
///
/// Within a stage projects run in plan order. A failed deploy stops the run
/// at once; any other failure stops it after the current stage. A step error
/// is recorded as the run's exception and ends the run.
pub async fn run_build(
    mut run_result: RunResult,
    executor: &StepsExecutor,
    reporters: &Reporters,
) -> RunResult {
    for stage in Stage::ALL {
        let executions: Vec<_> = run_result
            .run_plan()
            .get_projects_for_stage(stage)
            .into_iter()
            .cloned()
            .collect();
        if executions.is_empty() {
            continue;
        }
        info!(stage = %stage, projects = executions.len(), "Starting stage");

        for execution in executions {
            match executor.execute(stage, &execution).await {
                Ok(output) => {
                    let success = output.success;
                    let project = execution.project;
                    let name = project.name.clone();
                    run_result.append(StepResult::new(stage, project, output));
                    report(&mut run_result, reporters).await;
                    if !success && stage == Stage::Deploy {
                        warn!(project = %name, "Deploy failed, stopping run");
                        return run_result;
                    }
                }
                Err(exception) => {
                    error!(error = %exception, "Stopping run after step error");
                    run_result.set_exception(exception);
                    report(&mut run_result, reporters).await;
                    return run_result;
                }
            }
        }

        if run_result.has_failed_results() {
            warn!(stage = %stage, "Stage had failures, skipping later stages");
            return run_result;
        }
    }
    run_result
}

async fn report(run_result: &mut RunResult, reporters: &Reporters) {
    let deliveries = reporters.send_report(run_result).await;
    if deliveries.has_failures() {
        run_result.record_report_failures(deliveries);
    }
}
