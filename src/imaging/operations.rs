//! High-level image operations.
//!
//! These functions combine the pure calculations with the `image` crate's
//! resampling and blur. They take a decoded bitmap, compute geometry, and
//! return a new bitmap; they never touch the filesystem.

use super::calculations::{cover_crop_rect, fit_within};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};

/// Cover-fit `src` to exactly `width`×`height`, then blur it.
///
/// Center crops the source to the target aspect ratio, resizes the kept
/// region with Lanczos3, and applies a Gaussian blur of `blur_radius` (0
/// skips the blur). Any alpha channel is dropped first.
pub fn normalize_background(src: &DynamicImage, width: u32, height: u32, blur_radius: u32) -> RgbImage {
    let rgb = src.to_rgb8();
    let (x, y, w, h) = cover_crop_rect(rgb.dimensions(), (width, height));
    let cropped = imageops::crop_imm(&rgb, x, y, w, h).to_image();

    let resized = if cropped.dimensions() == (width, height) {
        cropped
    } else {
        imageops::resize(&cropped, width, height, FilterType::Lanczos3)
    };

    if blur_radius == 0 {
        resized
    } else {
        imageops::fast_blur(&resized, blur_radius as f32)
    }
}

/// Scale an icon to fit a `box_size` square, keeping its aspect ratio and
/// transparency.
pub fn scale_icon(src: &DynamicImage, box_size: u32) -> RgbaImage {
    let rgba = src.to_rgba8();
    let (w, h) = fit_within(rgba.dimensions(), box_size);
    if (w, h) == rgba.dimensions() {
        return rgba;
    }
    imageops::resize(&rgba, w, h, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient_rgba, split_rgba, solid_rgba};

    #[test]
    fn background_has_exact_canvas_size() {
        for (w, h) in [(640, 480), (100, 2000), (3000, 1000), (1920, 1080), (1, 1)] {
            let src = DynamicImage::ImageRgba8(solid_rgba(w, h, [40, 80, 120, 255]));
            let bg = normalize_background(&src, 192, 108, 2);
            assert_eq!(bg.dimensions(), (192, 108), "source {w}x{h}");
        }
    }

    #[test]
    fn background_from_extreme_strips() {
        // a 1px strip keeps a single source pixel, so the canvas is that color
        let tall = gradient_rgba(1, 5000);
        let wide = gradient_rgba(5000, 1);
        for src in [tall, wide] {
            let (sw, sh) = src.dimensions();
            let (x, y, _, _) = cover_crop_rect((sw, sh), (1920, 1080));
            let expected = src.get_pixel(x, y).0;
            let bg = normalize_background(&DynamicImage::ImageRgba8(src), 1920, 1080, 0);
            assert_eq!(bg.dimensions(), (1920, 1080), "source {sw}x{sh}");
            let p = bg.get_pixel(960, 540).0;
            for (got, want) in p.iter().zip(&expected[..3]) {
                assert!(got.abs_diff(*want) <= 2, "source {sw}x{sh}: {p:?} vs {expected:?}");
            }
        }
    }

    #[test]
    fn background_solid_color_survives_blur() {
        let src = DynamicImage::ImageRgba8(solid_rgba(300, 300, [40, 80, 120, 255]));
        let bg = normalize_background(&src, 192, 108, 5);
        for (x, y) in [(0, 0), (191, 107), (96, 54)] {
            let p = bg.get_pixel(x, y).0;
            for (got, want) in p.iter().zip([40u8, 80, 120]) {
                assert!(got.abs_diff(want) <= 1, "pixel ({x},{y}) = {p:?}");
            }
        }
    }

    #[test]
    fn background_cover_fit_leaves_no_unfilled_edge() {
        // Left half red, right half blue, very wide: the crop keeps the
        // middle, so both halves are present and no pixel is black padding.
        let src = DynamicImage::ImageRgba8(split_rgba(800, 100, [255, 0, 0, 255], [0, 0, 255, 255]));
        let bg = normalize_background(&src, 192, 108, 0);
        assert_eq!(bg.dimensions(), (192, 108));
        assert!(bg.pixels().all(|p| p.0 != [0, 0, 0]));
        assert!(bg.get_pixel(0, 54)[0] > 200);
        assert!(bg.get_pixel(191, 54)[2] > 200);
    }

    #[test]
    fn background_drops_alpha() {
        let src = DynamicImage::ImageRgba8(solid_rgba(50, 50, [10, 20, 30, 0]));
        let bg = normalize_background(&src, 20, 10, 0);
        assert_eq!(bg.get_pixel(5, 5).0, [10, 20, 30]);
    }

    #[test]
    fn icon_scales_up_into_box() {
        let icon = DynamicImage::ImageRgba8(solid_rgba(32, 16, [1, 2, 3, 200]));
        let scaled = scale_icon(&icon, 192);
        assert_eq!(scaled.dimensions(), (192, 96));
        assert_eq!(scaled.get_pixel(96, 48)[3], 200);
    }

    #[test]
    fn icon_scales_down_into_box() {
        let icon = DynamicImage::ImageRgba8(solid_rgba(1000, 500, [0, 0, 0, 255]));
        assert_eq!(scale_icon(&icon, 250).dimensions(), (250, 125));
    }
}
