//! Test assertions for step outputs and run results.

use crate::core::{ArtifactType, Output, Stage};
use crate::executor::RunResult;

/// Asserts that the output indicates success.
pub fn assert_output_succeeded(output: &Output) {
    assert!(output.success, "Expected success, got failure: {}", output.message);
}

/// Asserts that the output indicates failure.
pub fn assert_output_failed(output: &Output) {
    assert!(!output.success, "Expected failure, got success: {}", output.message);
}

/// Asserts that the output carries an artifact of the given type.
pub fn assert_output_produced(output: &Output, expected: ArtifactType) {
    assert!(
        output.produced(expected),
        "Expected artifact {expected}, got {:?}",
        output.produced_artifact.as_ref().map(|a| a.artifact_type)
    );
}

/// Asserts which projects have results for a stage, in order.
pub fn assert_stage_projects(result: &RunResult, stage: Stage, expected: &[&str]) {
    let actual: Vec<&str> = result
        .results_for_stage(stage)
        .iter()
        .map(|r| r.project.name.as_str())
        .collect();
    assert_eq!(actual, expected, "Unexpected projects for stage {stage}");
}
