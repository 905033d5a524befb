//! Shadow compositor.
//!
//! Every shadow is black, so each pass produces a canvas-sized alpha plane
//! (a `GrayImage`) rather than a full RGBA layer. The pipeline darkens the
//! canvas with the plane, then draws the crisp element on top. Title and
//! icon shadows are separate planes and never interact.
//!
//! | Pass | Source mask | Per layer |
//! |---|---|---|
//! | text drop shadow | rasterized lines | scale → shift (+o, +o) → blur |
//! | text inner shadow | rasterized lines | scale → shift (dx, dy); one soft blur at the end |
//! | icon drop shadow | each icon's alpha channel | scale → shift (+o, +o) → blur |

use image::{GrayImage, RgbaImage, imageops};

use crate::imaging::mask::{Mask, blur_padding};
use crate::imaging::{InnerShadowSpec, ShadowSpec};
use crate::types::{IconPlacement, TitleLayoutResult};
use crate::typography::Typeface;

/// Title text color.
pub const TEXT_COLOR: [u8; 3] = [255, 255, 255];

/// The title's lines rasterized at their final positions.
#[derive(Debug, Clone)]
pub struct TitleMasks {
    pub lines: Vec<Mask>,
    pub font_size_px: u32,
}

impl TitleMasks {
    pub fn render(face: &Typeface, layout: &TitleLayoutResult) -> Self {
        let lines = layout
            .lines
            .iter()
            .zip(&layout.line_origins)
            .filter_map(|(line, &(x, y))| face.render_mask(line, layout.font_size_px, x, y))
            .collect();
        Self {
            lines,
            font_size_px: layout.font_size_px,
        }
    }
}

/// Multi-layer drop shadow under the title text, farthest layer first.
pub fn render_text_drop_shadow(title: &TitleMasks, spec: &ShadowSpec, canvas: (u32, u32)) -> GrayImage {
    let mut plane = GrayImage::new(canvas.0, canvas.1);
    for line in &title.lines {
        for layer in spec.layers() {
            line.scaled(layer.alpha)
                .shifted(layer.offset, layer.offset)
                .blurred(layer.blur_radius)
                .composite_onto(&mut plane);
        }
    }
    plane
}

/// Simulated inner shadow: darker copies of each line nudged toward the
/// light, darkest first, softened together.
pub fn render_text_inner_shadow(title: &TitleMasks, spec: &InnerShadowSpec, canvas: (u32, u32)) -> GrayImage {
    let mut plane = GrayImage::new(canvas.0, canvas.1);
    let layers = spec.layers(title.font_size_px);
    let reach = layers
        .iter()
        .map(|l| l.dx.unsigned_abs().max(l.dy.unsigned_abs()))
        .max()
        .unwrap_or(0);

    let pad = reach + blur_padding(InnerShadowSpec::SOFTEN_RADIUS);
    for line in &title.lines {
        let mut combined = Mask::new(
            line.x - pad as i32,
            line.y - pad as i32,
            line.width() + 2 * pad,
            line.height() + 2 * pad,
        );
        for layer in &layers {
            line.scaled(layer.alpha)
                .shifted(layer.dx, layer.dy)
                .composite_into(&mut combined);
        }
        combined
            .blurred(InnerShadowSpec::SOFTEN_RADIUS)
            .composite_onto(&mut plane);
    }
    plane
}

/// Drop shadow derived from each icon's alpha channel.
pub fn render_icon_drop_shadow(icons: &[IconPlacement], spec: &ShadowSpec, canvas: (u32, u32)) -> GrayImage {
    let mut plane = GrayImage::new(canvas.0, canvas.1);
    for icon in icons {
        for layer in spec.layers() {
            Mask::from_alpha(&icon.bitmap, icon.x, icon.y, layer.alpha)
                .shifted(layer.offset, layer.offset)
                .blurred(layer.blur_radius)
                .composite_onto(&mut plane);
        }
    }
    plane
}

/// Draw the title lines in [`TEXT_COLOR`].
pub fn draw_title(canvas: &mut RgbaImage, title: &TitleMasks) {
    for line in &title.lines {
        line.paint_onto(canvas, TEXT_COLOR);
    }
}

/// Alpha-blend each icon onto the canvas at its placement.
pub fn paste_icons(canvas: &mut RgbaImage, icons: &[IconPlacement]) {
    for icon in icons {
        imageops::overlay(canvas, &icon.bitmap, icon.x as i64, icon.y as i64);
    }
}
