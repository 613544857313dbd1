pub mod distribute;
pub mod drop_zone;
pub mod reconcile;
pub mod tree;
pub mod types;

pub use distribute::{ColumnFrame, column_frames, equal_widths};
pub use drop_zone::{DragPayload, DropIntent, DropTarget, DropZone, Point, Size, resolve_drop, zone};
pub use reconcile::{ReconcileDiff, Reconciler};
pub use tree::LayoutTree;
pub use types::{Column, ColumnId, Pane, PaneId, PanePosition, Removal, Window, WindowId};
