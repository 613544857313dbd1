//! Drag-and-drop target zones and drop resolution.

use serde::{Deserialize, Serialize};

use super::tree::LayoutTree;
use super::types::{ColumnId, PaneId, WindowId};
use crate::projects::WorktreeId;

/// Pointer fractions of the target width bounding the center band.
pub const LEFT_EDGE_FRACTION: f64 = 0.2;
pub const RIGHT_EDGE_FRACTION: f64 = 0.8;

/// Targets narrower than this never accept drops.
pub const MIN_TARGET_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropZone {
    Left,
    Center,
    Right,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Classify a pointer position relative to the target's origin.
pub fn zone(pointer: Point, bounds: Size) -> DropZone {
    if bounds.width.is_nan() || bounds.width < MIN_TARGET_WIDTH {
        return DropZone::None;
    }
    if pointer.x < 0.0
        || pointer.x > bounds.width
        || pointer.y < 0.0
        || pointer.y > bounds.height
    {
        return DropZone::None;
    }
    let fraction = pointer.x / bounds.width;
    if fraction < LEFT_EDGE_FRACTION {
        DropZone::Left
    } else if fraction > RIGHT_EDGE_FRACTION {
        DropZone::Right
    } else {
        DropZone::Center
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropTarget {
    Pane(PaneId),
    Column(ColumnId),
}

/// What is being dragged: a worktree from the sidebar (`source_pane` is
/// `None`) or an existing pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPayload {
    pub worktree: WorktreeId,
    pub source_pane: Option<PaneId>,
}

/// The layout mutation a drop resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropIntent {
    Nothing,
    /// The worktree is already open; focus it instead of duplicating.
    Refocus { pane: PaneId },
    Assign { pane: PaneId, worktree: WorktreeId },
    InsertPane { column: ColumnId, index: usize, worktree: WorktreeId },
    InsertColumn { window: WindowId, index: usize, worktree: WorktreeId },
    Move { pane: PaneId, column: ColumnId, index: usize },
    MoveToNewColumn { pane: PaneId, window: WindowId, index: usize },
    /// Remove `source`, rebind `target` to the dragged worktree.
    Replace { source: PaneId, target: PaneId, worktree: WorktreeId },
}

/// Resolve a drop without mutating anything.
pub fn resolve_drop(
    layout: &LayoutTree,
    target: DropTarget,
    zone: DropZone,
    payload: &DragPayload,
) -> DropIntent {
    if zone == DropZone::None {
        return DropIntent::Nothing;
    }
    let after = usize::from(zone == DropZone::Right);

    match payload.source_pane {
        None => resolve_sidebar_drop(layout, target, zone, after, &payload.worktree),
        Some(source) => {
            if layout.pane(source).is_none() {
                return DropIntent::Nothing;
            }
            match (target, zone) {
                (DropTarget::Pane(pane), _) if pane == source => DropIntent::Nothing,
                (DropTarget::Pane(pane), DropZone::Center) => DropIntent::Replace {
                    source,
                    target: pane,
                    worktree: payload.worktree.clone(),
                },
                (DropTarget::Pane(pane), _) => match layout.position(pane) {
                    Some(position) => DropIntent::Move {
                        pane: source,
                        column: position.column,
                        index: position.index + after,
                    },
                    None => DropIntent::Nothing,
                },
                (DropTarget::Column(column), DropZone::Center) => {
                    match layout
                        .column(column)
                        .and_then(|c| c.panes().first())
                        .map(|p| p.id())
                    {
                        Some(first) if first != source => DropIntent::Replace {
                            source,
                            target: first,
                            worktree: payload.worktree.clone(),
                        },
                        _ => DropIntent::Nothing,
                    }
                }
                (DropTarget::Column(column), _) => match layout.column_position(column) {
                    Some((window, index)) => DropIntent::MoveToNewColumn {
                        pane: source,
                        window,
                        index: index + after,
                    },
                    None => DropIntent::Nothing,
                },
            }
        }
    }
}

fn resolve_sidebar_drop(
    layout: &LayoutTree,
    target: DropTarget,
    zone: DropZone,
    after: usize,
    worktree: &WorktreeId,
) -> DropIntent {
    // A worktree is shown in at most one place; dragging it again refocuses.
    if let Some(existing) = layout.locate_worktree(worktree) {
        return DropIntent::Refocus {
            pane: existing.pane,
        };
    }
    match (target, zone) {
        (DropTarget::Pane(pane), DropZone::Center) if layout.pane(pane).is_some() => {
            DropIntent::Assign {
                pane,
                worktree: worktree.clone(),
            }
        }
        (DropTarget::Pane(pane), _) => match layout.position(pane) {
            Some(position) if zone != DropZone::Center => DropIntent::InsertPane {
                column: position.column,
                index: position.index + after,
                worktree: worktree.clone(),
            },
            _ => DropIntent::Nothing,
        },
        (DropTarget::Column(column), DropZone::Center) => {
            match layout
                .column(column)
                .and_then(|c| c.panes().first())
                .map(|p| p.id())
            {
                Some(first) => DropIntent::Assign {
                    pane: first,
                    worktree: worktree.clone(),
                },
                None => DropIntent::Nothing,
            }
        }
        (DropTarget::Column(column), _) => match layout.column_position(column) {
            Some((window, index)) if layout.can_add_column(window) => DropIntent::InsertColumn {
                window,
                index: index + after,
                worktree: worktree.clone(),
            },
            _ => DropIntent::Nothing,
        },
    }
}
