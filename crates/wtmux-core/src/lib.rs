//! wtmux-core: worktree-aware terminal multiplexer core
//!
//! This library holds the business logic behind wtmux: terminal and runner
//! sessions per git worktree, the window/column/pane layout, cross-worktree
//! runner conflicts, listening-port detection, and agent status rollup.
//!
//! # Main Entry Points
//!
//! - [`state`] - The [`AppStore`] and its [`Command`]/[`Event`] vocabulary
//! - [`runtime`] - The control loop that owns the store
//! - [`sessions`] - Session registry, PTY backend, runners, conflicts, ports
//! - [`layout`] - Layout tree, drop zones, pane reconciliation
//! - [`status`] - Agent status aggregation and the hook status channel
//! - [`config`] - Configuration management

pub mod config;
pub mod errors;
pub mod events;
pub mod git;
pub mod layout;
pub mod logging;
pub mod projects;
pub mod runtime;
pub mod sessions;
pub mod state;
pub mod status;

// Re-export commonly used types at crate root for convenience
pub use config::{ProjectConfig, RunConfiguration, WtmuxConfig};
pub use errors::{WtmuxError, WtmuxResult};
pub use layout::{DropZone, LayoutTree, PaneId};
pub use projects::{Project, ProjectCatalog, ProjectError, Worktree, WorktreeId};
pub use runtime::{ControlHandle, ControlLoop};
pub use sessions::{
    Conflict, PendingLaunch, RunnerSelection, Session, SessionId, SessionKind, SessionState,
};
pub use state::{AppStore, Command, DispatchError, Event, StateSnapshot, Store};
pub use status::{AgentStatus, StatusAggregator};

// Re-export logging initialization
pub use logging::init_logging;
