//! Change sets produced by the version control collaborator.

mod changeset;
mod source;

pub use changeset::{sort_most_recent_first, ChangeStatus, Changeset};
#[cfg(test)]
pub use source::MockChangeSource;
pub use source::{ChangeSource, StaticChangeSource};
