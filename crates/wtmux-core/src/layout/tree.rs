use tracing::{debug, info, warn};

use super::drop_zone::{DropIntent, DropZone};
use super::types::{Column, ColumnId, Pane, PaneId, PanePosition, Removal, Window, WindowId};
use crate::projects::WorktreeId;
use crate::sessions::SessionId;

/// Windows → columns → panes.
///
/// Every column holds at least one pane; a window left without columns is
/// removed unless it is the only window. Operations on unknown ids return
/// `None`/`false` and leave the tree untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree {
    windows: Vec<Window>,
    next_id: u64,
    max_columns: usize,
    focused: Option<PaneId>,
}

impl LayoutTree {
    /// A tree with one empty window.
    pub fn new(max_columns: usize) -> Self {
        let mut tree = Self {
            windows: Vec::new(),
            next_id: 0,
            max_columns: max_columns.max(1),
            focused: None,
        };
        let id = WindowId::new(tree.allocate());
        tree.windows.push(Window::new(id, Vec::new()));
        tree
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn new_pane(&mut self, worktree: Option<WorktreeId>) -> Pane {
        Pane::new(PaneId::new(self.allocate()), worktree)
    }

    fn new_column(&mut self, worktree: Option<WorktreeId>) -> Column {
        let pane = self.new_pane(worktree);
        Column::new(ColumnId::new(self.allocate()), vec![pane])
    }

    // --- queries ---

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn max_columns(&self) -> usize {
        self.max_columns
    }

    pub fn focused(&self) -> Option<PaneId> {
        self.focused
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id() == id)
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        let (w, c) = self.column_indices(id)?;
        Some(&self.windows[w].columns()[c])
    }

    pub fn pane(&self, id: PaneId) -> Option<&Pane> {
        let (w, c, p) = self.pane_indices(id)?;
        Some(&self.windows[w].columns()[c].panes()[p])
    }

    pub fn position(&self, id: PaneId) -> Option<PanePosition> {
        let (w, c, p) = self.pane_indices(id)?;
        let window = &self.windows[w];
        let column = &window.columns()[c];
        Some(PanePosition {
            window: window.id(),
            column: column.id(),
            pane: id,
            index: p,
            column_minimized: column.is_minimized(),
        })
    }

    /// Window of a column and the column's index in it.
    pub fn column_position(&self, id: ColumnId) -> Option<(WindowId, usize)> {
        let (w, c) = self.column_indices(id)?;
        Some((self.windows[w].id(), c))
    }

    pub fn pane_ids(&self) -> Vec<PaneId> {
        self.windows
            .iter()
            .flat_map(|w| w.panes())
            .map(|p| p.id())
            .collect()
    }

    pub fn panes(&self) -> impl Iterator<Item = &Pane> {
        self.windows.iter().flat_map(|w| w.panes())
    }

    pub fn can_add_column(&self, window: WindowId) -> bool {
        self.window(window)
            .is_some_and(|w| w.columns().len() < self.max_columns)
    }

    /// Where `worktree` is shown, preferring panes in visible columns.
    pub fn locate_worktree(&self, worktree: &WorktreeId) -> Option<PanePosition> {
        let mut minimized = None;
        for pane in self.panes() {
            if pane.worktree() != Some(worktree) {
                continue;
            }
            let position = self.position(pane.id())?;
            if !position.column_minimized {
                return Some(position);
            }
            minimized.get_or_insert(position);
        }
        minimized
    }

    fn window_index(&self, id: WindowId) -> Option<usize> {
        self.windows.iter().position(|w| w.id() == id)
    }

    fn column_indices(&self, id: ColumnId) -> Option<(usize, usize)> {
        self.windows.iter().enumerate().find_map(|(w, window)| {
            window
                .columns()
                .iter()
                .position(|c| c.id() == id)
                .map(|c| (w, c))
        })
    }

    fn pane_indices(&self, id: PaneId) -> Option<(usize, usize, usize)> {
        for (w, window) in self.windows.iter().enumerate() {
            for (c, column) in window.columns().iter().enumerate() {
                if let Some(p) = column.panes().iter().position(|p| p.id() == id) {
                    return Some((w, c, p));
                }
            }
        }
        None
    }

    fn pane_mut(&mut self, id: PaneId) -> Option<&mut Pane> {
        let (w, c, p) = self.pane_indices(id)?;
        Some(&mut self.windows[w].columns_mut()[c].panes_mut()[p])
    }

    fn column_mut(&mut self, id: ColumnId) -> Option<&mut Column> {
        let (w, c) = self.column_indices(id)?;
        Some(&mut self.windows[w].columns_mut()[c])
    }

    // --- structure ---

    /// Add a window holding one column with one pane.
    pub fn add_window(&mut self, worktree: Option<WorktreeId>) -> WindowId {
        let id = WindowId::new(self.allocate());
        let column = self.new_column(worktree);
        self.windows.push(Window::new(id, vec![column]));
        info!(event = "core.layout.window_added", window_id = %id);
        id
    }

    /// Add a column after `after` (or at the end). Refused at the column cap.
    pub fn add_column(
        &mut self,
        window: WindowId,
        worktree: Option<WorktreeId>,
        after: Option<ColumnId>,
    ) -> Option<ColumnId> {
        let w = self.window_index(window)?;
        let index = match after {
            Some(after) => {
                self.windows[w]
                    .columns()
                    .iter()
                    .position(|c| c.id() == after)?
                    + 1
            }
            None => self.windows[w].columns().len(),
        };
        self.insert_column(window, index, worktree)
    }

    /// Insert a column at `index` (clamped). Refused at the column cap.
    pub fn insert_column(
        &mut self,
        window: WindowId,
        index: usize,
        worktree: Option<WorktreeId>,
    ) -> Option<ColumnId> {
        let w = self.window_index(window)?;
        if !self.can_add_column(window) {
            warn!(
                event = "core.layout.column_cap_reached",
                window_id = %window,
                max_columns = self.max_columns,
            );
            return None;
        }
        let column = self.new_column(worktree);
        let id = column.id();
        let columns = self.windows[w].columns_mut();
        let index = index.min(columns.len());
        columns.insert(index, column);
        debug!(event = "core.layout.column_added", window_id = %window, column_id = %id, index = index);
        Some(id)
    }

    /// New pane directly below `from`, showing the same worktree.
    pub fn split_pane(&mut self, from: PaneId) -> Option<PaneId> {
        let (w, c, p) = self.pane_indices(from)?;
        let worktree = self.windows[w].columns()[c].panes()[p].worktree().cloned();
        let pane = self.new_pane(worktree);
        let id = pane.id();
        self.windows[w].columns_mut()[c]
            .panes_mut()
            .insert(p + 1, pane);
        Some(id)
    }

    /// New pane at `index` (clamped) in `column`.
    pub fn insert_pane(
        &mut self,
        column: ColumnId,
        index: usize,
        worktree: Option<WorktreeId>,
    ) -> Option<PaneId> {
        let (w, c) = self.column_indices(column)?;
        let pane = self.new_pane(worktree);
        let id = pane.id();
        let panes = self.windows[w].columns_mut()[c].panes_mut();
        let index = index.min(panes.len());
        panes.insert(index, pane);
        Some(id)
    }

    /// Rebind a pane. Returns the previous binding.
    pub fn assign_worktree(
        &mut self,
        pane: PaneId,
        worktree: Option<WorktreeId>,
    ) -> Option<Option<WorktreeId>> {
        let pane = self.pane_mut(pane)?;
        Some(pane.bind(worktree))
    }

    /// Remove a pane, cascading to an emptied column and window.
    pub fn remove_pane(&mut self, id: PaneId) -> Option<Removal> {
        let (w, c, p) = self.pane_indices(id)?;
        let window_id = self.windows[w].id();
        let column_id = self.windows[w].columns()[c].id();
        let pane = self.windows[w].columns_mut()[c].panes_mut().remove(p);
        let (removed_column, removed_window) = self.prune(window_id, column_id);
        if self.focused == Some(id) {
            self.focused = None;
        }
        info!(
            event = "core.layout.pane_removed",
            pane_id = %id,
            removed_column = removed_column.is_some(),
            removed_window = removed_window.is_some(),
        );
        Some(Removal {
            pane,
            removed_column,
            removed_window,
        })
    }

    /// Remove a whole column and its panes, cascading to the window.
    pub fn remove_column(&mut self, id: ColumnId) -> Option<Vec<Pane>> {
        let (w, c) = self.column_indices(id)?;
        let window_id = self.windows[w].id();
        let mut column = self.windows[w].columns_mut().remove(c);
        let panes = std::mem::take(column.panes_mut());
        self.prune(window_id, id);
        if panes.iter().any(|p| Some(p.id()) == self.focused) {
            self.focused = None;
        }
        Some(panes)
    }

    /// Move a pane to `to_index` of `target_column`, possibly across
    /// windows. `to_index` counts positions before the move.
    pub fn move_pane(&mut self, id: PaneId, target_column: ColumnId, to_index: usize) -> bool {
        let Some((w, c, p)) = self.pane_indices(id) else {
            return false;
        };
        let Some((tw, tc)) = self.column_indices(target_column) else {
            return false;
        };

        if (w, c) == (tw, tc) {
            let panes = self.windows[w].columns_mut()[c].panes_mut();
            let pane = panes.remove(p);
            let to = if p < to_index { to_index - 1 } else { to_index };
            let to = to.min(panes.len());
            panes.insert(to, pane);
            return true;
        }

        let window_id = self.windows[w].id();
        let column_id = self.windows[w].columns()[c].id();
        let pane = self.windows[w].columns_mut()[c].panes_mut().remove(p);
        let panes = self.windows[tw].columns_mut()[tc].panes_mut();
        let to = to_index.min(panes.len());
        panes.insert(to, pane);
        self.prune(window_id, column_id);
        debug!(event = "core.layout.pane_moved", pane_id = %id, column_id = %target_column, index = to);
        true
    }

    /// Move a pane into a new column at `column_index` of `window`.
    /// Refused if that would exceed the column cap.
    pub fn move_pane_to_new_column(
        &mut self,
        id: PaneId,
        window: WindowId,
        column_index: usize,
    ) -> Option<ColumnId> {
        let (w, c, p) = self.pane_indices(id)?;
        let tw = self.window_index(window)?;
        let source_vanishes = self.windows[w].columns()[c].panes().len() == 1;
        let net_new = !(w == tw && source_vanishes);
        if net_new && !self.can_add_column(window) {
            warn!(
                event = "core.layout.column_cap_reached",
                window_id = %window,
                max_columns = self.max_columns,
            );
            return None;
        }

        let window_id = self.windows[w].id();
        let column_id = self.windows[w].columns()[c].id();
        let pane = self.windows[w].columns_mut()[c].panes_mut().remove(p);
        let new_id = ColumnId::new(self.allocate());
        let columns = self.windows[tw].columns_mut();
        let index = column_index.min(columns.len());
        columns.insert(index, Column::new(new_id, vec![pane]));
        self.prune(window_id, column_id);
        Some(new_id)
    }

    /// Drop `column` if empty, then its window if empty and not the last one.
    fn prune(&mut self, window: WindowId, column: ColumnId) -> (Option<ColumnId>, Option<WindowId>) {
        let Some(w) = self.window_index(window) else {
            return (None, None);
        };
        let mut removed_column = None;
        if let Some(c) = self.windows[w].columns().iter().position(|col| col.id() == column)
            && self.windows[w].columns()[c].panes().is_empty()
        {
            self.windows[w].columns_mut().remove(c);
            removed_column = Some(column);
        }
        let mut removed_window = None;
        if self.windows[w].columns().is_empty() && self.windows.len() > 1 {
            self.windows.remove(w);
            removed_window = Some(window);
        }
        (removed_column, removed_window)
    }

    // --- column flags ---

    pub fn minimize_column(&mut self, id: ColumnId) -> bool {
        self.set_minimized(id, true)
    }

    pub fn restore_column(&mut self, id: ColumnId) -> bool {
        self.set_minimized(id, false)
    }

    fn set_minimized(&mut self, id: ColumnId, minimized: bool) -> bool {
        match self.column_mut(id) {
            Some(column) if column.is_minimized() != minimized => {
                column.set_minimized(minimized);
                true
            }
            _ => false,
        }
    }

    pub fn toggle_side_panel(&mut self, id: ColumnId) -> Option<bool> {
        self.column_mut(id).map(Column::toggle_side_panel)
    }

    pub fn toggle_runner_panel(&mut self, id: ColumnId) -> Option<bool> {
        self.column_mut(id).map(Column::toggle_runner_panel)
    }

    // --- pane state ---

    /// Focus a pane, restoring its column if minimized.
    pub fn focus_pane(&mut self, id: PaneId) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        if position.column_minimized {
            self.restore_column(position.column);
        }
        self.focused = Some(id);
        true
    }

    pub fn set_active_tab(&mut self, pane: PaneId, tab: Option<SessionId>) -> bool {
        self.pane_mut(pane).map(|p| p.set_active_tab(tab)).is_some()
    }

    pub fn set_drop_zone(&mut self, pane: PaneId, zone: DropZone) -> bool {
        self.pane_mut(pane).map(|p| p.set_drop_zone(zone)).is_some()
    }

    pub fn clear_drop_zones(&mut self) {
        for window in &mut self.windows {
            for column in window.columns_mut() {
                for pane in column.panes_mut() {
                    pane.set_drop_zone(DropZone::None);
                }
            }
        }
    }

    pub fn set_changed_files(&mut self, pane: PaneId, count: Option<usize>) -> bool {
        self.pane_mut(pane).map(|p| p.set_changed_files(count)).is_some()
    }

    /// Apply a resolved drop. Returns the pane that ends up focused.
    pub fn apply_drop(&mut self, intent: &DropIntent) -> Option<PaneId> {
        let focus = match intent {
            DropIntent::Nothing => return None,
            DropIntent::Refocus { pane } => Some(*pane),
            DropIntent::Assign { pane, worktree } => {
                self.assign_worktree(*pane, Some(worktree.clone()))?;
                Some(*pane)
            }
            DropIntent::InsertPane {
                column,
                index,
                worktree,
            } => self.insert_pane(*column, *index, Some(worktree.clone())),
            DropIntent::InsertColumn {
                window,
                index,
                worktree,
            } => {
                let column = self.insert_column(*window, *index, Some(worktree.clone()))?;
                self.column(column)?.panes().first().map(|p| p.id())
            }
            DropIntent::Move {
                pane,
                column,
                index,
            } => self.move_pane(*pane, *column, *index).then_some(*pane),
            DropIntent::MoveToNewColumn {
                pane,
                window,
                index,
            } => self
                .move_pane_to_new_column(*pane, *window, *index)
                .map(|_| *pane),
            DropIntent::Replace {
                source,
                target,
                worktree,
            } => {
                self.pane(*target)?;
                self.remove_pane(*source)?;
                self.assign_worktree(*target, Some(worktree.clone()))?;
                Some(*target)
            }
        };
        if let Some(pane) = focus {
            self.focus_pane(pane);
        }
        focus
    }
}
