use serde::Serialize;

use crate::layout::{ColumnId, DropIntent, DropZone, PaneId, Window};
use crate::projects::{ProjectId, WorktreeId};
use crate::sessions::{Conflict, PendingLaunch, Session, SessionId, SessionKind, SessionState, TabScope};
use crate::status::AgentStatus;

/// State changes produced by dispatched commands and runtime notifications.
///
/// Each variant describes what happened. Failures use the error channel,
/// never the event stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    ProjectRegistered { id: ProjectId },
    ProjectRemoved { id: ProjectId },
    WorktreeAdded { worktree: WorktreeId },
    WorktreeRemoved { worktree: WorktreeId },

    SessionCreated {
        id: SessionId,
        kind: SessionKind,
        title: String,
        state: SessionState,
    },
    SessionStarted {
        id: SessionId,
        run: u64,
        pid: Option<u32>,
    },
    /// Termination was requested; `SessionExited` follows when the process dies.
    SessionStopRequested { id: SessionId },
    /// The previous run was killed and a new one spawned.
    SessionRestarted { id: SessionId, run: u64 },
    SessionExited {
        id: SessionId,
        state: SessionState,
        exit_code: i32,
    },
    SessionReset { id: SessionId },
    SessionRemoved { id: SessionId },
    SessionRenamed { id: SessionId, title: String },
    /// Spawn failed; the session stays idle with the error recorded.
    SessionFailedToStart { id: SessionId, message: String },
    TabsReordered { scope: TabScope },
    ActiveTabChanged {
        scope: TabScope,
        id: Option<SessionId>,
    },
    PortsChanged { id: SessionId, ports: Vec<u16> },

    /// A launch was held back; confirm with `Command::ConfirmSwitch`.
    LaunchConflict {
        conflict: Conflict,
        configured_ports: Vec<u16>,
        pending: PendingLaunch,
    },
    RunnersLaunched {
        worktree: WorktreeId,
        started: Vec<SessionId>,
    },
    SiblingRunnersCleared {
        worktree: WorktreeId,
        removed: Vec<SessionId>,
    },

    /// Panes appeared or disappeared.
    LayoutChanged {
        added: Vec<PaneId>,
        removed: Vec<PaneId>,
    },
    /// A column's flags changed (minimized, panels).
    ColumnChanged { column: ColumnId },
    PaneAssigned {
        pane: PaneId,
        worktree: Option<WorktreeId>,
    },
    PaneFocused { pane: PaneId },
    DropHint { pane: Option<PaneId>, zone: DropZone },
    DropApplied { intent: DropIntent },
    ChangedFilesUpdated { pane: PaneId, count: Option<usize> },

    StatusChanged {
        worktree: WorktreeId,
        status: AgentStatus,
    },

    Snapshot(Box<StateSnapshot>),
}

/// A read-only copy of everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub version: u64,
    pub windows: Vec<Window>,
    pub focused: Option<PaneId>,
    /// Sorted by id.
    pub sessions: Vec<Session>,
    /// Non-idle worktrees only.
    pub statuses: Vec<(WorktreeId, AgentStatus)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_variant_tag() {
        let event = Event::SessionExited {
            id: SessionId::from_raw("runner:feat:web"),
            state: SessionState::Failed,
            exit_code: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["SessionExited"]["id"], "runner:feat:web");
        assert_eq!(json["SessionExited"]["state"], "failed");
        assert_eq!(json["SessionExited"]["exit_code"], 1);
    }

    #[test]
    fn test_status_changed_uses_camel_case_status() {
        let event = Event::StatusChanged {
            worktree: WorktreeId::new("main"),
            status: AgentStatus::NeedsAttention,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["StatusChanged"]["status"], "needsAttention");
    }
}
