//! Core domain model types for monoflow.
//!
//! This module contains the fundamental value types used throughout the crate:
//! - The ordered set of pipeline stages
//! - Artifact types and artifacts
//! - Step outputs

mod artifact;
mod output;
mod stage;

pub use artifact::{Artifact, ArtifactType};
pub use output::{Output, CACHED_MESSAGE};
pub use stage::{Stage, UnknownStageError};
