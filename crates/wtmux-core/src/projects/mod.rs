pub mod catalog;
pub mod errors;
pub mod types;

pub use catalog::ProjectCatalog;
pub use errors::ProjectError;
pub use types::{Project, ProjectId, Worktree, WorktreeId};
