//! Column width distribution.

use serde::Serialize;

use super::types::{ColumnId, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnFrame {
    pub column: ColumnId,
    pub x: u32,
    pub width: u32,
}

/// Split `total` into `n` widths differing by at most one, wider first.
pub fn equal_widths(total: u32, n: usize) -> Vec<u32> {
    let Ok(count) = u32::try_from(n) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }
    let base = total / count;
    let extra = total % count;
    (0..count).map(|i| base + u32::from(i < extra)).collect()
}

/// Minimized columns get a fixed strip; the rest share the remainder equally.
pub fn column_frames(window: &Window, total: u32, minimized_width: u32) -> Vec<ColumnFrame> {
    let columns = window.columns();
    let minimized = columns.iter().filter(|c| c.is_minimized()).count();
    let minimized_total = minimized_width.saturating_mul(u32::try_from(minimized).unwrap_or(u32::MAX));
    let mut shared = equal_widths(total.saturating_sub(minimized_total), columns.len() - minimized).into_iter();

    let mut x = 0u32;
    columns
        .iter()
        .map(|column| {
            let width = if column.is_minimized() {
                minimized_width
            } else {
                shared.next().unwrap_or(0)
            };
            let frame = ColumnFrame {
                column: column.id(),
                x,
                width,
            };
            x = x.saturating_add(width);
            frame
        })
        .collect()
}
