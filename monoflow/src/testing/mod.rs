//! Testing utilities for monoflow pipelines.
//!
//! This module provides:
//! - Step doubles that record, fail or break
//! - Project, change history and run property fixtures
//! - Assertions for outputs and run results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_output_failed, assert_output_produced, assert_output_succeeded, assert_stage_projects,
};
pub use fixtures::{changeset, run_properties, write_project_descriptor, ProjectFixture};
pub use mocks::{ErroringStep, FailingStep, RecordedExecution, RecordingStep};
