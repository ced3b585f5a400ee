//! Project model.
//!
//! Projects are loaded once per invocation and are read-only afterwards.

mod load;
mod model;

pub use load::{descriptor_location, load_project, load_projects};
pub use model::{
    matches_prefix, project_root_dir, Dependencies, Project, Stages, PROJECT_DESCRIPTOR,
};
