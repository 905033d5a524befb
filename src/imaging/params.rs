//! Parameter types for shadow passes and title sizing.
//!
//! These structs describe *what* to render, not *how*. The config layer
//! deserializes them straight from TOML and the compositor consumes them
//! unchanged, so a config file and a unit test speak the same vocabulary.
//!
//! ## Types
//!
//! - [`ShadowSpec`]: one multi-layer drop shadow: opacity, max offset, max blur, layer count.
//! - [`InnerShadowSpec`]: simulated inner shadow: opacity, light angle, size relative to the element.
//! - [`TitleLadder`]: the shrinking sequence of candidate font sizes for the title.

use serde::{Deserialize, Serialize};

/// A multi-layer drop shadow.
///
/// Layer `i` sits at offset `offset_px * (L + 1 - i) / (L + 1)`; its opacity
/// and blur radius scale with `offset_i / offset_px`, so farther layers are
/// fainter and softer. See [`ShadowSpec::layers`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShadowSpec {
    /// Opacity of the nearest layer, 0.0–1.0.
    pub opacity: f64,
    /// Offset of the farthest layer along both axes.
    pub offset_px: u32,
    /// Blur radius of the farthest layer.
    pub blur_radius_px: u32,
    pub layer_count: u32,
}

/// One resolved drop-shadow layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowLayer {
    pub offset: i32,
    /// Alpha of the shadow color, 0–255.
    pub alpha: u8,
    pub blur_radius: u32,
}

impl ShadowSpec {
    /// The stock drop shadow: 85% black, offsets 12/9/6, blur up to 40.
    pub fn standard() -> Self {
        Self {
            opacity: 0.85,
            offset_px: 12,
            blur_radius_px: 40,
            layer_count: 3,
        }
    }

    /// Resolve the individual layers, farthest first.
    pub fn layers(&self) -> Vec<ShadowLayer> {
        if self.offset_px == 0 {
            return Vec::new();
        }
        let count = self.layer_count.max(1);
        let base_alpha = (255.0 * self.opacity.clamp(0.0, 1.0)).trunc();
        (0..count)
            .map(|i| {
                let offset = self.offset_px * (count + 1 - i) / (count + 1);
                let fraction = offset as f64 / self.offset_px as f64;
                ShadowLayer {
                    offset: offset as i32,
                    alpha: (base_alpha * fraction) as u8,
                    blur_radius: (self.blur_radius_px as f64 * fraction) as u32,
                }
            })
            .filter(|layer| layer.offset > 0)
            .collect()
    }
}

impl Default for ShadowSpec {
    fn default() -> Self {
        Self::standard()
    }
}

/// A simulated inner shadow: darker copies nudged toward the light source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InnerShadowSpec {
    pub opacity: f64,
    /// Direction of the nudge, counter-clockwise from the +x axis in screen
    /// terms (30° points up and to the right).
    pub angle_degrees: f64,
    /// Nudge length as a fraction of the font pixel size (or icon size).
    pub size_fraction: f64,
    pub layer_count: u32,
}

/// One resolved inner-shadow copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InnerShadowLayer {
    pub dx: i32,
    pub dy: i32,
    pub alpha: u8,
}

impl InnerShadowSpec {
    /// Blur applied to the combined inner-shadow copies.
    pub const SOFTEN_RADIUS: u32 = 2;
    /// Smallest nudge length regardless of element size.
    pub const MIN_SIZE_PX: u32 = 3;

    pub fn standard() -> Self {
        Self {
            opacity: 0.45,
            angle_degrees: 30.0,
            size_fraction: 0.08,
            layer_count: 3,
        }
    }

    /// Resolve the copies for an element of `element_px` (font size or icon size),
    /// darkest first. Intensities fall linearly from 1.0 to 0.4.
    pub fn layers(&self, element_px: u32) -> Vec<InnerShadowLayer> {
        let size = ((element_px as f64 * self.size_fraction) as u32).max(Self::MIN_SIZE_PX) as f64;
        let radians = self.angle_degrees.to_radians();
        let dx = (size * radians.cos()).trunc();
        let dy = -(size * radians.sin()).trunc();
        let base_alpha = (255.0 * self.opacity.clamp(0.0, 1.0)).trunc();
        let count = self.layer_count.max(1);

        (0..count)
            .map(|i| {
                let intensity = if count == 1 {
                    1.0
                } else {
                    1.0 - 0.6 * i as f64 / (count - 1) as f64
                };
                InnerShadowLayer {
                    dx: (dx * intensity) as i32,
                    dy: (dy * intensity) as i32,
                    alpha: (base_alpha * intensity) as u8,
                }
            })
            .collect()
    }
}

impl Default for InnerShadowSpec {
    fn default() -> Self {
        Self::standard()
    }
}

/// Candidate font sizes for the title, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleLadder {
    pub initial_pt: f64,
    pub min_pt: f64,
    pub step_pt: f64,
}

impl TitleLadder {
    /// Rungs from largest to smallest. The minimum is always the last rung,
    /// even when the step skips over it.
    pub fn rungs(&self) -> Vec<f64> {
        let mut rungs = Vec::new();
        let mut size = self.initial_pt;
        if self.step_pt <= 0.0 || self.initial_pt <= self.min_pt {
            rungs.push(self.initial_pt.max(self.min_pt));
            return rungs;
        }
        while size > self.min_pt {
            rungs.push(size);
            size -= self.step_pt;
        }
        rungs.push(self.min_pt);
        rungs
    }
}

impl Default for TitleLadder {
    fn default() -> Self {
        Self {
            initial_pt: 158.52,
            min_pt: 60.0,
            step_pt: 6.0,
        }
    }
}
