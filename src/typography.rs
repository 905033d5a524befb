//! Fonts: fallback chain, measurement, and glyph rasterization.
//!
//! A title face is chosen from a ranked list of [`FontSource`]s with a
//! "first available" policy. The list always ends in [`FontSource::Builtin`],
//! a bold oblique face compiled into the binary, so resolution cannot fail
//! for lack of installed fonts.
//!
//! Layout code only needs widths and heights, so it talks to the
//! [`TextMeasure`] trait; [`Typeface`] is the real implementation and tests
//! use a fixed-advance mock.
//!
//! Metrics are ink metrics: the width of a string is the horizontal extent of
//! the pixels its glyphs would cover, not the sum of advances. `px` is always
//! the em size in pixels.

use ab_glyph::{Font, FontArc, Glyph, PxScale, Rect, ScaleFont, point};
use image::Luma;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::imaging::mask::Mask;

/// DejaVu Sans Bold Oblique (see `assets/fonts/DejaVu-LICENSE.txt`).
static BUILTIN_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-BoldOblique.ttf");

/// Reference string whose ink height defines the line height.
const LINE_HEIGHT_PROBE: &str = "Ay";

#[derive(Error, Debug)]
pub enum FontError {
    #[error("cannot read font {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("not a usable font: {0}")]
    Invalid(String),
}

/// One entry of the font fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    Path(PathBuf),
    Builtin,
}

impl FontSource {
    fn describe(&self) -> String {
        match self {
            FontSource::Path(path) => path.display().to_string(),
            FontSource::Builtin => "built-in".to_string(),
        }
    }
}

/// Build the fallback chain: user fonts, then installed faces, then the
/// built-in face.
pub fn font_chain(user_fonts: &[PathBuf], installed: &[PathBuf]) -> Vec<FontSource> {
    user_fonts
        .iter()
        .chain(installed)
        .cloned()
        .map(FontSource::Path)
        .chain(std::iter::once(FontSource::Builtin))
        .collect()
}

/// Width and height measurements for a line of text at a pixel size.
pub trait TextMeasure {
    /// Ink width of `text` at em size `px`.
    fn line_width(&self, text: &str, px: u32) -> u32;

    /// Line height at em size `px`.
    fn line_height(&self, px: u32) -> u32;
}

/// A loaded font face.
#[derive(Clone)]
pub struct Typeface {
    font: FontArc,
    origin: String,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeface").field("origin", &self.origin).finish()
    }
}

impl Typeface {
    pub fn builtin() -> Result<Self, FontError> {
        let font = FontArc::try_from_slice(BUILTIN_FONT)
            .map_err(|e| FontError::Invalid(format!("built-in: {e}")))?;
        Ok(Self {
            font,
            origin: "built-in".into(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, FontError> {
        let data = std::fs::read(path).map_err(|source| FontError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| FontError::Invalid(format!("{}: {e}", path.display())))?;
        Ok(Self {
            font,
            origin: path.display().to_string(),
        })
    }

    /// Load the first available source in `chain`.
    pub fn resolve(chain: &[FontSource]) -> Result<Self, FontError> {
        let mut last_err = None;
        for (rank, source) in chain.iter().enumerate() {
            let loaded = match source {
                FontSource::Path(path) if !path.exists() => continue,
                FontSource::Path(path) => Self::from_path(path),
                FontSource::Builtin => Self::builtin(),
            };
            match loaded {
                Ok(face) => {
                    if rank > 0 && matches!(source, FontSource::Builtin) {
                        tracing::warn!("no configured or installed font available, using built-in face");
                    }
                    tracing::debug!(font = %source.describe(), "title font resolved");
                    return Ok(face);
                }
                Err(e) => {
                    tracing::warn!(font = %source.describe(), error = %e, "skipping font");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| FontError::Invalid("empty font chain".into())))
    }

    /// Where this face was loaded from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn scale(&self, px: u32) -> PxScale {
        // PxScale is the ascent-to-descent height; rescale so `px` is the em.
        let upem = self.font.units_per_em().unwrap_or(1000.0);
        PxScale::from(px as f32 * self.font.height_unscaled() / upem)
    }

    /// Glyphs of `text` laid out on one line whose ascender top is at `(x, y)`.
    fn layout(&self, text: &str, px: u32, x: f32, y: f32) -> Vec<Glyph> {
        let scale = self.scale(px);
        let scaled = self.font.as_scaled(scale);
        let baseline = y + scaled.ascent();
        let mut cursor = x;
        let mut previous = None;
        let mut glyphs = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                cursor += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scale, point(cursor, baseline)));
            cursor += scaled.h_advance(id);
            previous = Some(id);
        }
        glyphs
    }

    /// Union of the pixel bounds of every visible glyph.
    fn ink_bounds(&self, glyphs: &[Glyph]) -> Option<Rect> {
        glyphs
            .iter()
            .filter_map(|g| self.font.outline_glyph(g.clone()))
            .map(|o| o.px_bounds())
            .reduce(|a, b| Rect {
                min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
                max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
            })
    }

    /// Rasterize one line of text into a coverage mask. `(x, y)` is the top
    /// of the ascender at the line's starting pen position.
    pub fn render_mask(&self, text: &str, px: u32, x: i32, y: i32) -> Option<Mask> {
        let glyphs = self.layout(text, px, x as f32, y as f32);
        let bounds = self.ink_bounds(&glyphs)?;
        let mx = bounds.min.x.floor() as i32;
        let my = bounds.min.y.floor() as i32;
        let w = (bounds.max.x.ceil() as i32 - mx).max(1) as u32;
        let h = (bounds.max.y.ceil() as i32 - my).max(1) as u32;
        let mut mask = Mask::new(mx, my, w, h);

        for glyph in glyphs {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let gb = outlined.px_bounds();
            let ox = gb.min.x as i32 - mx;
            let oy = gb.min.y as i32 - my;
            outlined.draw(|gx, gy, coverage| {
                let px = ox + gx as i32;
                let py = oy + gy as i32;
                if px < 0 || py < 0 || px as u32 >= w || py as u32 >= h {
                    return;
                }
                let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                let dst = mask.plane.get_pixel_mut(px as u32, py as u32);
                // overlapping glyphs keep the stronger coverage
                if value > dst[0] {
                    *dst = Luma([value]);
                }
            });
        }
        Some(mask)
    }
}

impl TextMeasure for Typeface {
    fn line_width(&self, text: &str, px: u32) -> u32 {
        let glyphs = self.layout(text, px, 0.0, 0.0);
        self.ink_bounds(&glyphs)
            .map(|b| (b.max.x - b.min.x).max(0.0).ceil() as u32)
            .unwrap_or(0)
    }

    fn line_height(&self, px: u32) -> u32 {
        let glyphs = self.layout(LINE_HEIGHT_PROBE, px, 0.0, 0.0);
        self.ink_bounds(&glyphs)
            .map(|b| (b.max.y - b.min.y).max(0.0).ceil() as u32)
            .unwrap_or(px)
    }
}
