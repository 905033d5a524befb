//! Single-channel coverage masks for shadow rendering.
//!
//! Shadows are always black, so a shadow layer is fully described by its
//! alpha plane. Working on one channel instead of four keeps the blur passes
//! cheap, and cropping each mask to its content (plus blur padding) keeps
//! them cheaper still.

use image::{GrayImage, Luma, RgbaImage};

/// An alpha plane positioned on the canvas. `(x, y)` is the canvas position
/// of the plane's top-left pixel and may be negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub plane: GrayImage,
    pub x: i32,
    pub y: i32,
}

/// `src` over `dst` for alpha values.
#[inline]
pub fn over(src: u8, dst: u8) -> u8 {
    let rest = (dst as u32 * (255 - src as u32) + 127) / 255;
    (src as u32 + rest) as u8
}

/// Scale an alpha value by `factor / 255`.
#[inline]
pub fn scale_alpha(alpha: u8, factor: u8) -> u8 {
    ((alpha as u32 * factor as u32 + 127) / 255) as u8
}

impl Mask {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            plane: GrayImage::new(width.max(1), height.max(1)),
            x,
            y,
        }
    }

    /// Shadow mask of an RGBA bitmap: its alpha channel, scaled by
    /// `opacity / 255` and placed at `(x, y)`.
    pub fn from_alpha(bitmap: &RgbaImage, x: i32, y: i32, opacity: u8) -> Self {
        let plane = GrayImage::from_fn(bitmap.width(), bitmap.height(), |px, py| {
            Luma([scale_alpha(bitmap.get_pixel(px, py)[3], opacity)])
        });
        Self { plane, x, y }
    }

    pub fn width(&self) -> u32 {
        self.plane.width()
    }

    pub fn height(&self) -> u32 {
        self.plane.height()
    }

    /// Move the mask without touching its pixels.
    pub fn shifted(mut self, dx: i32, dy: i32) -> Self {
        self.x += dx;
        self.y += dy;
        self
    }

    /// Grow the plane by `pad` transparent pixels on every side, keeping the
    /// content at the same canvas position.
    pub fn padded(&self, pad: u32) -> Self {
        if pad == 0 {
            return self.clone();
        }
        let mut plane = GrayImage::new(self.width() + 2 * pad, self.height() + 2 * pad);
        image::imageops::replace(&mut plane, &self.plane, pad as i64, pad as i64);
        Self {
            plane,
            x: self.x - pad as i32,
            y: self.y - pad as i32,
        }
    }

    /// Gaussian-blurred copy. The plane is padded first so the falloff is not
    /// clipped at the mask edge.
    pub fn blurred(&self, radius: u32) -> Self {
        if radius == 0 {
            return self.clone();
        }
        let padded = self.padded(blur_padding(radius));
        Self {
            plane: image::imageops::fast_blur(&padded.plane, radius as f32),
            x: padded.x,
            y: padded.y,
        }
    }

    /// Copy with every value multiplied by `factor / 255`.
    pub fn scaled(&self, factor: u8) -> Self {
        let mut plane = self.plane.clone();
        for p in plane.pixels_mut() {
            p[0] = scale_alpha(p[0], factor);
        }
        Self {
            plane,
            x: self.x,
            y: self.y,
        }
    }

    /// Composite this mask over a canvas-sized shadow plane. Pixels outside
    /// the target are dropped.
    pub fn composite_onto(&self, target: &mut GrayImage) {
        self.composite_at(target, 0, 0);
    }

    /// Composite this mask over another positioned mask.
    pub fn composite_into(&self, target: &mut Mask) {
        let (tx, ty) = (target.x, target.y);
        self.composite_at(&mut target.plane, tx, ty);
    }

    fn composite_at(&self, target: &mut GrayImage, tx: i32, ty: i32) {
        let (tw, th) = (target.width() as i64, target.height() as i64);
        for (px, py, value) in self.plane.enumerate_pixels() {
            let v = value[0];
            if v == 0 {
                continue;
            }
            let cx = self.x as i64 - tx as i64 + px as i64;
            let cy = self.y as i64 - ty as i64 + py as i64;
            if cx < 0 || cy < 0 || cx >= tw || cy >= th {
                continue;
            }
            let dst = target.get_pixel_mut(cx as u32, cy as u32);
            dst[0] = over(v, dst[0]);
        }
    }

    /// Paint a solid `color` onto the canvas with this mask as coverage.
    pub fn paint_onto(&self, canvas: &mut RgbaImage, color: [u8; 3]) {
        let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
        for (px, py, value) in self.plane.enumerate_pixels() {
            let a = value[0] as u32;
            if a == 0 {
                continue;
            }
            let cx = self.x as i64 + px as i64;
            let cy = self.y as i64 + py as i64;
            if cx < 0 || cy < 0 || cx >= cw || cy >= ch {
                continue;
            }
            let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
            for (channel, &c) in dst.0.iter_mut().zip(color.iter()) {
                *channel = ((*channel as u32 * (255 - a) + c as u32 * a + 127) / 255) as u8;
            }
            dst.0[3] = over(value[0], dst.0[3]);
        }
    }

    /// Bounding box of non-zero pixels in plane coordinates, if any.
    pub fn content_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (px, py, value) in self.plane.enumerate_pixels() {
            if value[0] == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (px, py, px, py),
                Some((x0, y0, x1, y1)) => (x0.min(px), y0.min(py), x1.max(px), y1.max(py)),
            });
        }
        bounds
    }
}

/// Padding that keeps a blur of `radius` (used as sigma) from clipping.
pub fn blur_padding(radius: u32) -> u32 {
    radius * 3 + 1
}

/// Composite a black shadow plane over an RGBA canvas of the same size.
pub fn darken(canvas: &mut RgbaImage, plane: &GrayImage) {
    for (pixel, alpha) in canvas.pixels_mut().zip(plane.pixels()) {
        let a = alpha[0] as u32;
        if a == 0 {
            continue;
        }
        for channel in pixel.0.iter_mut().take(3) {
            *channel = ((*channel as u32 * (255 - a) + 127) / 255) as u8;
        }
        pixel.0[3] = over(alpha[0], pixel.0[3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::solid_rgba;

    #[test]
    fn over_identities() {
        assert_eq!(over(0, 77), 77);
        assert_eq!(over(255, 13), 255);
        assert_eq!(over(128, 0), 128);
        // 128 + 128 * 127 / 255 = 128 + 64
        assert_eq!(over(128, 128), 192);
    }

    #[test]
    fn from_alpha_scales_by_opacity() {
        let mut icon = solid_rgba(2, 1, [200, 10, 10, 255]);
        icon.get_pixel_mut(1, 0)[3] = 0;
        let mask = Mask::from_alpha(&icon, 5, 6, 216);
        assert_eq!(mask.plane.get_pixel(0, 0)[0], 216);
        assert_eq!(mask.plane.get_pixel(1, 0)[0], 0);
        assert_eq!((mask.x, mask.y), (5, 6));
    }

    #[test]
    fn padded_keeps_canvas_position() {
        let mut mask = Mask::new(10, 20, 2, 2);
        mask.plane.put_pixel(0, 0, Luma([255]));
        let padded = mask.padded(4);
        assert_eq!((padded.x, padded.y), (6, 16));
        assert_eq!((padded.width(), padded.height()), (10, 10));
        assert_eq!(padded.plane.get_pixel(4, 4)[0], 255);
    }

    #[test]
    fn blur_spreads_without_clipping() {
        let mut mask = Mask::new(100, 100, 4, 4);
        for p in mask.plane.pixels_mut() {
            *p = Luma([255]);
        }
        let blurred = mask.blurred(5);
        let (x0, y0, x1, y1) = blurred.content_bounds().unwrap();
        // falloff reaches beyond the original 4x4 block
        assert!(blurred.x + (x0 as i32) < 100);
        assert!(blurred.y + (y1 as i32) > 103);
        assert!(x1 > x0 && y1 > y0);
        // edges of the padded plane stay empty
        assert_eq!(blurred.plane.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn composite_clips_to_target() {
        let mut mask = Mask::new(-1, -1, 3, 3);
        for p in mask.plane.pixels_mut() {
            *p = Luma([100]);
        }
        let mut target = GrayImage::new(4, 4);
        mask.composite_onto(&mut target);
        assert_eq!(target.get_pixel(0, 0)[0], 100);
        assert_eq!(target.get_pixel(1, 1)[0], 100);
        assert_eq!(target.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn composite_into_respects_both_offsets() {
        let mut src = Mask::new(12, 7, 1, 1);
        src.plane.put_pixel(0, 0, Luma([200]));
        let mut target = Mask::new(10, 5, 4, 4);
        src.composite_into(&mut target);
        assert_eq!(target.plane.get_pixel(2, 2)[0], 200);
        assert_eq!(target.plane.pixels().filter(|p| p[0] > 0).count(), 1);
    }

    #[test]
    fn scaled_multiplies_values() {
        let mut mask = Mask::new(0, 0, 2, 1);
        mask.plane.put_pixel(0, 0, Luma([255]));
        mask.plane.put_pixel(1, 0, Luma([100]));
        let half = mask.scaled(128);
        assert_eq!(half.plane.get_pixel(0, 0)[0], 128);
        assert_eq!(half.plane.get_pixel(1, 0)[0], 50);
    }

    #[test]
    fn paint_blends_color_by_coverage() {
        let mut canvas = solid_rgba(3, 1, [0, 0, 0, 255]);
        let mut mask = Mask::new(1, 0, 2, 1);
        mask.plane.put_pixel(0, 0, Luma([255]));
        mask.plane.put_pixel(1, 0, Luma([51]));
        mask.paint_onto(&mut canvas, [255, 255, 255]);
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(1, 0).0, [255, 255, 255, 255]);
        assert_eq!(canvas.get_pixel(2, 0).0, [51, 51, 51, 255]);
    }

    #[test]
    fn darken_blends_toward_black() {
        let mut canvas = solid_rgba(2, 1, [200, 100, 50, 255]);
        let mut plane = GrayImage::new(2, 1);
        plane.put_pixel(0, 0, Luma([255]));
        plane.put_pixel(1, 0, Luma([0]));
        darken(&mut canvas, &plane);
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(1, 0).0, [200, 100, 50, 255]);
    }
}
