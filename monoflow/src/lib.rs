//! # Monoflow
//!
//! Incremental build, test and deploy orchestration for monorepos.
//!
//! Monoflow decides which projects of a monorepository a change history
//! affects and runs their pipeline steps stage by stage:
//!
//! - **Incremental discovery**: projects are invalidated per stage by changes
//!   under their own root or their declared dependencies
//! - **Durable artifacts**: every step output is persisted per project and
//!   stage, so separate `build`, `test` and `deploy` invocations hand
//!   artifacts to each other
//! - **Pluggable steps**: step implementations are registered explicitly and
//!   declare the artifacts they produce and require
//! - **Fail-fast execution**: later stages never run after a failed stage and a
//!   failed deploy stops the run immediately
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use monoflow::prelude::*;
//!
//! let registry = Arc::new(StepRegistry::new().with_step(Arc::new(DockerBuild::new())));
//! let orchestrator = Orchestrator::new(".", change_source, registry, run_properties);
//!
//! let result = orchestrator.run(BuildRequest::new()).await?;
//! println!("{}", monoflow::reporting::format::to_text(&result));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod changes;
pub mod config;
pub mod core;
pub mod discovery;
pub mod errors;
pub mod executor;
pub mod observability;
pub mod orchestrator;
pub mod parallel;
pub mod project;
pub mod reporting;
pub mod steps;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::changes::{ChangeSource, ChangeStatus, Changeset, StaticChangeSource};
    pub use crate::config::{MonoflowConfig, RunProperties, Target, VersioningProperties};
    pub use crate::core::{Artifact, ArtifactType, Output, Stage};
    pub use crate::discovery::{Discovery, ProjectExecution, RunPlan};
    pub use crate::errors::{ExecutionException, MonoflowError, RequiredArtifactMissing};
    pub use crate::executor::{run_build, RunResult, StepResult, StepsExecutor};
    pub use crate::observability::init_logging;
    pub use crate::orchestrator::{BuildRequest, ChangeSelection, Orchestrator};
    pub use crate::project::{load_project, load_projects, Project};
    pub use crate::reporting::{LoggingReporter, ReportOutcome, Reporter, Reporters};
    pub use crate::steps::{Step, StepInput, StepMeta, StepRegistry};
    pub use crate::store::{FileOutputStore, InMemoryOutputStore, OutputStore};
}
