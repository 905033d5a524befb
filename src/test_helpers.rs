//! Shared test utilities for the thumbforge test suite.
//!
//! Provides synthetic bitmaps, encoders, and fixture writers so tests never
//! depend on checked-in image files or the network.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let bg = write_png(tmp.path(), "bg.png", &gradient_rgba(640, 360));
//! let icon = ImageSource::EncodedBytes(encode_png(&solid_rgba(64, 64, [255, 0, 0, 255])));
//! ```

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

// =========================================================================
// Synthetic bitmaps
// =========================================================================

/// Uniform RGBA bitmap.
pub fn solid_rgba(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// Left half `left`, right half `right`.
pub fn split_rgba(width: u32, height: u32, left: [u8; 4], right: [u8; 4]) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 { Rgba(left) } else { Rgba(right) }
    })
}

/// Deterministic opaque diagonal gradient, useful as a busy background.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = ((x + y) % 256) as u8;
        Rgba([r, g, b, 255])
    })
}

/// Opaque disc on a transparent square, like a typical logo icon.
pub fn disc_rgba(size: u32, color: [u8; 3]) -> RgbaImage {
    let c = size as f64 / 2.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f64 + 0.5 - c;
        let dy = y as f64 + 0.5 - c;
        if dx * dx + dy * dy <= c * c {
            Rgba([color[0], color[1], color[2], 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

// =========================================================================
// Encoding and fixtures
// =========================================================================

/// PNG-encode a bitmap in memory.
pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Write a bitmap as PNG into `dir` and return its path.
pub fn write_png(dir: &Path, name: &str, img: &RgbaImage) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encode_png(img)).unwrap();
    path
}
