//! Pure calculation functions for canvas geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Fractions follow the stock layout: the title box is 85% of the canvas
//! width, the icon row at most 90%.

/// Points to pixels at 96 DPI (`px = pt * 96 / 72`), truncated.
///
/// # Examples
/// ```
/// # use thumbforge::imaging::calculations::pt_to_px;
/// assert_eq!(pt_to_px(158.52), 211);
/// assert_eq!(pt_to_px(60.0), 80);
/// ```
pub fn pt_to_px(pt: f64) -> u32 {
    (pt * 96.0 / 72.0).max(0.0) as u32
}

/// Calculate the source region to keep for a cover fit (crop before resize).
///
/// Returns the largest centered rectangle of `source` that has the aspect
/// ratio of `target`. Resizing that region to exactly `target` covers the
/// whole target area with no unfilled edge, and the resampling work is
/// bounded by the source and target sizes however extreme the source aspect.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(x, y, width, height)` - Crop rectangle in source pixels, never empty
pub fn cover_crop_rect(source: (u32, u32), target: (u32, u32)) -> (u32, u32, u32, u32) {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));
    let (tgt_w, tgt_h) = (target.0.max(1), target.1.max(1));

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    let (w, h) = if src_aspect > tgt_aspect {
        // Source is wider: keep full height, trim the sides
        let w = (src_h as f64 * tgt_aspect).round() as u32;
        (w.clamp(1, src_w), src_h)
    } else {
        // Source is taller: keep full width, trim top and bottom
        let h = (src_w as f64 / tgt_aspect).round() as u32;
        (src_w, h.clamp(1, src_h))
    };

    ((src_w - w) / 2, (src_h - h) / 2, w, h)
}

/// Horizontal origin that centers a span of `width` on the canvas.
///
/// Floor division, so odd leftovers put the extra pixel on the right.
pub fn centered_x(width: u32, canvas_w: u32) -> i32 {
    (canvas_w as i64 - width as i64).div_euclid(2) as i32
}

/// Vertical anchors for the title block, as fractions of the free height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleAnchors {
    pub single_line: f64,
    pub two_lines: f64,
}

impl Default for TitleAnchors {
    fn default() -> Self {
        Self {
            single_line: 0.38,
            two_lines: 0.32,
        }
    }
}

/// Top of the title block.
///
/// One line sits at 38% of the free height, two lines at 32% to leave room
/// for the icon row below.
pub fn title_block_top(block_height: u32, line_count: usize, canvas_h: u32, anchors: TitleAnchors) -> i32 {
    let free = canvas_h as f64 - block_height as f64;
    let fraction = if line_count <= 1 {
        anchors.single_line
    } else {
        anchors.two_lines
    };
    (free * fraction).trunc() as i32
}

/// Bounding box edge for each icon, chosen by icon count.
///
/// 18% of the canvas width for one icon, 14% for two or three, 10% for four
/// or more; then clamped to `[100, 250]`.
pub fn icon_box_size(count: usize, canvas_w: u32) -> u32 {
    let fraction = match count {
        0 | 1 => 0.18,
        2 | 3 => 0.14,
        _ => 0.10,
    };
    ((canvas_w as f64 * fraction) as u32).clamp(100, 250)
}

/// Scale `(w, h)` to fit inside a `box_size` square, preserving aspect ratio.
///
/// Small icons are scaled up; nothing is cropped. Both edges stay at least 1px.
pub fn fit_within(dims: (u32, u32), box_size: u32) -> (u32, u32) {
    let (w, h) = (dims.0.max(1) as f64, dims.1.max(1) as f64);
    let ratio = (box_size as f64 / w).min(box_size as f64 / h);
    (((w * ratio) as u32).max(1), ((h * ratio) as u32).max(1))
}

/// Gap between icons in the row.
///
/// Starts at `max(15, 1.5% of canvas width)`. When the row would exceed 90% of
/// the canvas width, the gap shrinks to exactly fill 90% (floor 10).
pub fn icon_row_spacing(widths: &[u32], canvas_w: u32) -> u32 {
    let base = 15.max((canvas_w as f64 * 0.015) as u32);
    if widths.len() < 2 {
        return base;
    }
    let icons_total: u64 = widths.iter().map(|&w| w as u64).sum();
    let gaps = (widths.len() - 1) as u64;
    let limit = canvas_w as f64 * 0.9;
    if (icons_total + base as u64 * gaps) as f64 > limit {
        let shrunk = ((limit - icons_total as f64) / gaps as f64).trunc();
        (shrunk.max(10.0)) as u32
    } else {
        base
    }
}

/// Total row width: icons plus gaps.
pub fn icon_row_width(widths: &[u32], spacing: u32) -> u32 {
    let icons: u32 = widths.iter().sum();
    icons + spacing * (widths.len().saturating_sub(1) as u32)
}

/// Top of the icon row: 68% of the canvas height, lifted so the tallest icon
/// keeps a 20px bottom margin.
pub fn icon_row_top(tallest: u32, canvas_h: u32) -> i32 {
    let anchor = (canvas_h as f64 * 0.68) as i64;
    let lifted = canvas_h as i64 - tallest as i64 - 20;
    anchor.min(lifted) as i32
}
