//! Stage execution.
//!
//! [`StepsExecutor`] runs one project in one stage; [`run_build`] drives a
//! whole plan and accumulates a [`RunResult`].

mod engine;
mod result;
mod run;


pub use engine::StepsExecutor;
pub use result::{RunResult, StepResult};
pub use run::run_build;
