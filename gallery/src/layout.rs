//! Grid geometry for the photo grid.
//!
//! The grid is centred in the viewport with [`OUTER_PADDING`] on each side,
//! and every thumbnail carries [`ITEM_MARGIN`] around it.

use crate::preferences::ThumbnailSize;

pub const OUTER_PADDING: f32 = 10.0;
pub const ITEM_MARGIN: f32 = 2.0;

/// Number of thumbnail columns that fit in `viewport_width`. Never less than one.
pub fn column_count(viewport_width: f32, thumbnail: ThumbnailSize) -> usize {
    let usable = viewport_width - 2.0 * OUTER_PADDING;
    let cell = thumbnail.pixels() as f32 + 2.0 * ITEM_MARGIN;
    if !usable.is_finite() || usable <= 0.0 {
        return 1;
    }
    ((usable / cell).floor() as usize).max(1)
}

/// Rows needed to lay out `count` photos in `columns` columns.
pub fn row_count(count: usize, columns: usize) -> usize {
    count.div_ceil(columns.max(1))
}
