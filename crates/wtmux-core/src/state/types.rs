use serde::Serialize;

use crate::layout::{ColumnId, DragPayload, DropTarget, PaneId, Point, Size, WindowId};
use crate::projects::{Project, ProjectId, Worktree, WorktreeId};
use crate::sessions::{PendingLaunch, RunnerSelection, SessionId};

/// All operations that can be dispatched through the store.
///
/// Commands are built by the UI layer or the CLI and executed one at a time.
/// They serialize for logging, but do not deserialize: a [`PendingLaunch`]
/// only exists because a conflict was actually detected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Command {
    /// Add a project (and its worktrees) to the catalog.
    RegisterProject { project: Project },
    /// Remove a project, its sessions, and its status entries.
    RemoveProject { id: ProjectId },
    AddWorktree { project: ProjectId, worktree: Worktree },
    RemoveWorktree { worktree: WorktreeId },

    /// Open a new terminal tab in the pane's current worktree.
    OpenTab { pane: PaneId },
    StartSession { id: SessionId },
    StopSession { id: SessionId },
    RestartSession { id: SessionId },
    /// Return a finished session to idle without starting it.
    ResetSession { id: SessionId },
    /// Remove a session, killing its process.
    CloseSession { id: SessionId },
    RenameSession { id: SessionId, title: String },
    MoveTab { id: SessionId, to_index: usize },
    SelectTab { id: SessionId },

    /// Launch runners for a worktree, subject to the sibling conflict check.
    LaunchRunners {
        worktree: WorktreeId,
        selection: RunnerSelection,
    },
    /// Resolve a detected conflict by removing the sibling's runners first.
    ConfirmSwitch { pending: PendingLaunch },
    StopRunners { worktree: WorktreeId },
    /// Run (or re-run) the project's setup commands in the pane's worktree.
    RunSetup { pane: PaneId },

    AddWindow { worktree: Option<WorktreeId> },
    AddColumn {
        window: WindowId,
        worktree: Option<WorktreeId>,
        /// Insert after this column; appended when `None`.
        after: Option<ColumnId>,
    },
    SplitPane { pane: PaneId },
    AssignWorktree {
        pane: PaneId,
        worktree: Option<WorktreeId>,
    },
    MovePane {
        pane: PaneId,
        column: ColumnId,
        index: usize,
    },
    /// Close a pane. Its sessions are removed when `stop_sessions` is set,
    /// otherwise they are left running without a pane.
    ClosePane { pane: PaneId, stop_sessions: bool },
    CloseColumn { column: ColumnId, stop_sessions: bool },
    MinimizeColumn { column: ColumnId },
    RestoreColumn { column: ColumnId },
    ToggleSidePanel { column: ColumnId },
    ToggleRunnerPanel { column: ColumnId },
    FocusPane { pane: PaneId },

    /// Pointer moved over a pane during a drag; updates the drop hint.
    HoverDrop {
        pane: PaneId,
        pointer: Point,
        bounds: Size,
    },
    /// Drag released over a target.
    Drop {
        target: DropTarget,
        pointer: Point,
        bounds: Size,
        payload: DragPayload,
    },
    CancelDrag,

    /// Emit a full [`StateSnapshot`](super::events::StateSnapshot).
    Snapshot,
}
