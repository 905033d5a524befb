//! Icon row layout.
//!
//! Scales every icon into a common square box sized by the icon count, then
//! lays them out as one centered row near the bottom of the canvas.

use image::DynamicImage;

use crate::imaging::calculations::{
    icon_box_size, icon_row_spacing, icon_row_top, icon_row_width,
};
use crate::imaging::scale_icon;
use crate::types::{IconLayoutResult, IconPlacement};

/// Scale and place `icons` (in order) on a `canvas_w`×`canvas_h` canvas.
///
/// An icon that would extend past the canvas is left out and counted in
/// [`IconLayoutResult::skipped`]; the others keep their slots.
pub fn layout_icons(icons: &[DynamicImage], canvas_w: u32, canvas_h: u32) -> IconLayoutResult {
    if icons.is_empty() {
        return IconLayoutResult::default();
    }

    let box_size = icon_box_size(icons.len(), canvas_w);
    let scaled: Vec<_> = icons.iter().map(|icon| scale_icon(icon, box_size)).collect();
    let widths: Vec<u32> = scaled.iter().map(|b| b.width()).collect();

    let spacing = icon_row_spacing(&widths, canvas_w);
    let row_width = icon_row_width(&widths, spacing);
    let x0 = (canvas_w.saturating_sub(row_width) / 2) as i32;
    let tallest = scaled.iter().map(|b| b.height()).max().unwrap_or(0);
    let row_y = icon_row_top(tallest, canvas_h);

    let mut placements = Vec::with_capacity(scaled.len());
    let mut skipped = 0;
    let mut x = x0;
    for bitmap in scaled {
        let (w, h) = bitmap.dimensions();
        let y = row_y + ((tallest - h) / 2) as i32;
        let fits = x >= 0
            && y >= 0
            && x as i64 + w as i64 <= canvas_w as i64
            && y as i64 + h as i64 <= canvas_h as i64;
        if fits {
            placements.push(IconPlacement { bitmap, x, y });
        } else {
            tracing::warn!(x, y, width = w, height = h, "icon falls outside the canvas, skipping");
            skipped += 1;
        }
        x += (w + spacing) as i32;
    }

    IconLayoutResult {
        placements,
        box_size,
        spacing,
        row_y,
        skipped,
    }
}
