pub mod aggregator;
pub mod errors;
pub mod hook;
pub mod paths;
pub mod types;
pub mod watcher;

pub use aggregator::{ClearEffect, ClearScope, StatusAggregator, StatusUpdate};
pub use errors::StatusError;
pub use paths::WorktreePaths;
pub use types::{AgentStatus, RawStatusEvent, StatusEvent, StatusKind};
pub use watcher::StatusFileWatcher;
