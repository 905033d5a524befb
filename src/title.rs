//! Dynamic title layout.
//!
//! Finds the largest font size on a shrinking ladder at which the title
//! wraps into at most two lines inside the text box, then places the lines
//! on the canvas.
//!
//! ```text
//! for each rung (158.52pt, 152.52pt, ... , 60pt):
//!     greedy wrap at pt_to_px(rung)
//!     ≤ 2 lines → done
//! ladder exhausted:
//!     split the words near the middle         (both halves fit → done)
//!     greedy first line + filled second line  (ellipsis if words remain)
//! ```
//!
//! Every branch yields one or two lines; nothing here can produce three.

use thiserror::Error;

use crate::imaging::TitleLadder;
use crate::imaging::calculations::{TitleAnchors, centered_x, pt_to_px, title_block_top};
use crate::typography::TextMeasure;
use crate::types::{LineBreaking, TitleLayoutResult};

const ELLIPSIS: &str = "…";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("title is empty")]
    EmptyTitle,
    #[error("no usable width for the title ({0}px)")]
    NoWidth(u32),
}

/// Everything that shapes the title besides the text and the face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleStyle {
    pub ladder: TitleLadder,
    /// Width of the text box in pixels.
    pub max_width_px: u32,
    /// Gap between lines as a fraction of the line height.
    pub line_spacing_fraction: f64,
    pub anchors: TitleAnchors,
}

impl TitleStyle {
    /// Stock style for a canvas: 85% text box, 0.3 line spacing.
    pub fn for_canvas(canvas_w: u32) -> Self {
        Self {
            ladder: TitleLadder::default(),
            max_width_px: (canvas_w as f64 * 0.85) as u32,
            line_spacing_fraction: 0.3,
            anchors: TitleAnchors::default(),
        }
    }
}

/// Lay out `title` on a `canvas`-sized frame.
pub fn layout_title(
    title: &str,
    measure: &impl TextMeasure,
    style: &TitleStyle,
    canvas: (u32, u32),
) -> Result<TitleLayoutResult, LayoutError> {
    let words: Vec<&str> = title.split_whitespace().collect();
    if words.is_empty() {
        return Err(LayoutError::EmptyTitle);
    }
    if style.max_width_px == 0 {
        return Err(LayoutError::NoWidth(style.max_width_px));
    }
    let max_width = style.max_width_px;

    let rungs = style.ladder.rungs();
    let mut chosen = None;
    for &pt in &rungs {
        let px = pt_to_px(pt);
        let lines = greedy_wrap(&words, measure, px, max_width);
        tracing::debug!(pt, px, lines = lines.len(), "title size attempt");
        if lines.len() <= 2 {
            chosen = Some((pt, px, lines, LineBreaking::Greedy));
            break;
        }
    }

    let (pt, px, lines, breaking) = match chosen {
        Some(found) => found,
        None => {
            let pt = rungs.last().copied().unwrap_or(style.ladder.min_pt);
            let px = pt_to_px(pt);
            let (lines, breaking) = forced_two_lines(&words, measure, px, max_width);
            tracing::warn!(pt, ?breaking, "title too long for the size ladder, forcing two lines");
            (pt, px, lines, breaking)
        }
    };

    Ok(place_lines(pt, px, lines, breaking, measure, style, canvas))
}

/// Greedy word wrap: a line takes words while it still fits; a word wider
/// than the box gets a line of its own.
pub fn greedy_wrap(words: &[&str], measure: &impl TextMeasure, px: u32, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in words {
        let candidate = if current.is_empty() {
            (*word).to_string()
        } else {
            format!("{current} {word}")
        };
        if measure.line_width(&candidate, px) <= max_width {
            current = candidate;
        } else if current.is_empty() {
            lines.push((*word).to_string());
        } else {
            lines.push(std::mem::replace(&mut current, (*word).to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Index of the last word of the first line for a midpoint split.
///
/// Looks outward from the middle, within two words either side, for a word
/// longer than three characters; falls back to the middle itself. The
/// result always leaves at least one word for the second line.
pub fn midpoint_split_index(words: &[&str]) -> usize {
    let n = words.len();
    let mid = n / 2;
    if n < 2 {
        return 0;
    }
    let lo = mid.saturating_sub(2).max(1);
    let hi = (mid + 3).min(n - 1);
    let candidates = std::iter::once(mid).chain((1..=2).flat_map(|d| [mid.wrapping_sub(d), mid + d]));
    candidates
        .filter(|&i| i >= lo && i < hi)
        .find(|&i| words[i].chars().count() > 3)
        .unwrap_or(mid)
        .min(n - 2)
}

fn forced_two_lines(
    words: &[&str],
    measure: &impl TextMeasure,
    px: u32,
    max_width: u32,
) -> (Vec<String>, LineBreaking) {
    let split = midpoint_split_index(words);
    let first = words[..=split].join(" ");
    let second = words[split + 1..].join(" ");
    if measure.line_width(&first, px) <= max_width && measure.line_width(&second, px) <= max_width {
        return (vec![first, second], LineBreaking::MidpointSplit);
    }
    (naive_two_lines(words, measure, px, max_width), LineBreaking::NaiveTwoLine)
}

/// Greedy first line, greedy second line; when words are left over the
/// second line ends in an ellipsis, trimmed until it fits.
fn naive_two_lines(words: &[&str], measure: &impl TextMeasure, px: u32, max_width: u32) -> Vec<String> {
    let mut lines = greedy_wrap(words, measure, px, max_width);
    if lines.len() <= 2 {
        return lines;
    }
    lines.truncate(2);

    let mut second = lines[1].clone();
    while !second.is_empty() && measure.line_width(&format!("{second}{ELLIPSIS}"), px) > max_width {
        match second.rsplit_once(' ') {
            Some((head, _)) => second = head.to_string(),
            None => {
                second.pop();
            }
        }
    }
    lines[1] = format!("{second}{ELLIPSIS}");
    lines
}

fn place_lines(
    pt: f64,
    px: u32,
    lines: Vec<String>,
    breaking: LineBreaking,
    measure: &impl TextMeasure,
    style: &TitleStyle,
    canvas: (u32, u32),
) -> TitleLayoutResult {
    let line_height = measure.line_height(px);
    let spacing = (line_height as f64 * style.line_spacing_fraction) as u32;
    let n = lines.len() as u32;
    let block = n * line_height + n.saturating_sub(1) * spacing;
    let top = title_block_top(block, lines.len(), canvas.1, style.anchors);

    let line_origins = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let x = centered_x(measure.line_width(line, px), canvas.0);
            (x, top + (i as u32 * (line_height + spacing)) as i32)
        })
        .collect();

    TitleLayoutResult {
        font_size_pt: pt,
        font_size_px: px,
        lines,
        line_height_px: line_height,
        line_spacing_px: spacing,
        line_origins,
        breaking,
    }
}
