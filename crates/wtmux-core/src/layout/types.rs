use std::fmt;

use serde::{Deserialize, Serialize};

use super::drop_zone::DropZone;
use crate::projects::WorktreeId;
use crate::sessions::SessionId;

macro_rules! layout_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

layout_id!(WindowId, "window");
layout_id!(ColumnId, "column");
layout_id!(PaneId, "pane");

/// A leaf of the layout: at most one worktree plus per-pane UI state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pane {
    id: PaneId,
    worktree: Option<WorktreeId>,
    active_tab: Option<SessionId>,
    drop_zone: DropZone,
    changed_files: Option<usize>,
}

impl Pane {
    pub(super) fn new(id: PaneId, worktree: Option<WorktreeId>) -> Self {
        Self {
            id,
            worktree,
            active_tab: None,
            drop_zone: DropZone::None,
            changed_files: None,
        }
    }

    pub fn id(&self) -> PaneId {
        self.id
    }

    pub fn worktree(&self) -> Option<&WorktreeId> {
        self.worktree.as_ref()
    }

    pub fn active_tab(&self) -> Option<&SessionId> {
        self.active_tab.as_ref()
    }

    /// Drop-target highlight while a drag hovers this pane.
    pub fn drop_zone(&self) -> DropZone {
        self.drop_zone
    }

    /// Uncommitted file count of the bound worktree, once computed.
    pub fn changed_files(&self) -> Option<usize> {
        self.changed_files
    }

    pub(super) fn bind(&mut self, worktree: Option<WorktreeId>) -> Option<WorktreeId> {
        self.active_tab = None;
        self.changed_files = None;
        std::mem::replace(&mut self.worktree, worktree)
    }

    pub(super) fn set_active_tab(&mut self, tab: Option<SessionId>) {
        self.active_tab = tab;
    }

    pub(super) fn set_drop_zone(&mut self, zone: DropZone) {
        self.drop_zone = zone;
    }

    pub(super) fn set_changed_files(&mut self, count: Option<usize>) {
        self.changed_files = count;
    }
}

/// Vertical stack of panes with its own side/runner panel toggles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    id: ColumnId,
    panes: Vec<Pane>,
    show_side_panel: bool,
    show_runner_panel: bool,
    minimized: bool,
}

impl Column {
    pub(super) fn new(id: ColumnId, panes: Vec<Pane>) -> Self {
        Self {
            id,
            panes,
            show_side_panel: false,
            show_runner_panel: false,
            minimized: false,
        }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn show_side_panel(&self) -> bool {
        self.show_side_panel
    }

    pub fn show_runner_panel(&self) -> bool {
        self.show_runner_panel
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub(super) fn panes_mut(&mut self) -> &mut Vec<Pane> {
        &mut self.panes
    }

    pub(super) fn set_minimized(&mut self, minimized: bool) {
        self.minimized = minimized;
    }

    pub(super) fn toggle_side_panel(&mut self) -> bool {
        self.show_side_panel = !self.show_side_panel;
        self.show_side_panel
    }

    pub(super) fn toggle_runner_panel(&mut self) -> bool {
        self.show_runner_panel = !self.show_runner_panel;
        self.show_runner_panel
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    id: WindowId,
    columns: Vec<Column>,
}

impl Window {
    pub(super) fn new(id: WindowId, columns: Vec<Column>) -> Self {
        Self { id, columns }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(super) fn columns_mut(&mut self) -> &mut Vec<Column> {
        &mut self.columns
    }

    pub fn panes(&self) -> impl Iterator<Item = &Pane> {
        self.columns.iter().flat_map(|c| c.panes.iter())
    }
}

/// Where a pane sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanePosition {
    pub window: WindowId,
    pub column: ColumnId,
    pub pane: PaneId,
    /// Index of the pane within its column.
    pub index: usize,
    pub column_minimized: bool,
}

/// What a pane removal took down with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub pane: Pane,
    pub removed_column: Option<ColumnId>,
    pub removed_window: Option<WindowId>,
}
