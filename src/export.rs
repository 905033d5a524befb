//! Final output: PNG encoding, inline previews, and the layer dump.
//!
//! ## Layer dump
//!
//! When requested, a directory is written next to the PNG:
//!
//! ```text
//! thumbnail.png
//! thumbnail_layers/
//! ├── 01_background.png      # blurred, cover-fit background
//! ├── 02_title.json          # title text, size, lines, positions, shadows
//! ├── 03_icon_01.png         # each placed icon at its processed size
//! └── 03_icon_02.png
//! ```
//!
//! This is a convenience for hand-editing in an image editor, not a layered
//! file format; nothing reads it back.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbImage};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::imaging::{InnerShadowSpec, ShadowSpec};
use crate::types::{IconPlacement, LineBreaking, TitleLayoutResult};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A finished, opaque thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    image: RgbImage,
}

impl Thumbnail {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn to_png_bytes(&self) -> Result<Vec<u8>, ExportError> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    /// `data:image/png;base64,...` for inline previews.
    pub fn to_data_url(&self) -> Result<String, ExportError> {
        Ok(format!(
            "data:image/png;base64,{}",
            STANDARD.encode(self.to_png_bytes()?)
        ))
    }

    /// SHA-256 of the raw RGB pixels, as a hex string.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.image.width().to_le_bytes());
        hasher.update(self.image.height().to_le_bytes());
        hasher.update(self.image.as_raw());
        format!("{:x}", hasher.finalize())
    }

    /// Write as PNG, creating parent directories as needed.
    pub fn save_png(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_png_bytes()?)?;
        Ok(())
    }
}

/// `<dir>/<stem>_layers` for an output file.
pub fn layers_dir_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "thumbnail".to_string());
    output.with_file_name(format!("{stem}_layers"))
}

/// Everything the layer dump records.
pub struct LayerDump<'a> {
    pub background: &'a RgbImage,
    pub title: &'a str,
    pub title_layout: &'a TitleLayoutResult,
    pub font: &'a str,
    pub text_color: [u8; 3],
    pub text_drop_shadow: &'a ShadowSpec,
    pub text_inner_shadow: &'a InnerShadowSpec,
    pub icons: &'a [IconPlacement],
    pub icon_drop_shadow: &'a ShadowSpec,
}

#[derive(Serialize)]
struct TitleLayer<'a> {
    text: &'a str,
    font: &'a str,
    font_size_pt: f64,
    font_size_px: u32,
    color: String,
    lines: Vec<PlacedLine<'a>>,
    line_height_px: u32,
    line_spacing_px: u32,
    breaking: LineBreaking,
    drop_shadow: &'a ShadowSpec,
    inner_shadow: &'a InnerShadowSpec,
    icons: Vec<IconLayer>,
    icon_drop_shadow: &'a ShadowSpec,
}

#[derive(Serialize)]
struct PlacedLine<'a> {
    text: &'a str,
    x: i32,
    y: i32,
}

#[derive(Serialize)]
struct IconLayer {
    file: String,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

fn icon_file_name(index: usize) -> String {
    format!("03_icon_{:02}.png", index + 1)
}

/// Write the layer dump into `dir` and return the files written.
pub fn write_layers(dir: &Path, dump: &LayerDump<'_>) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let background = dir.join("01_background.png");
    dump.background.save_with_format(&background, ImageFormat::Png)?;
    written.push(background);

    let layout = dump.title_layout;
    let info = TitleLayer {
        text: dump.title,
        font: dump.font,
        font_size_pt: layout.font_size_pt,
        font_size_px: layout.font_size_px,
        color: format!(
            "#{:02x}{:02x}{:02x}",
            dump.text_color[0], dump.text_color[1], dump.text_color[2]
        ),
        lines: layout
            .lines
            .iter()
            .zip(&layout.line_origins)
            .map(|(text, &(x, y))| PlacedLine { text, x, y })
            .collect(),
        line_height_px: layout.line_height_px,
        line_spacing_px: layout.line_spacing_px,
        breaking: layout.breaking,
        drop_shadow: dump.text_drop_shadow,
        inner_shadow: dump.text_inner_shadow,
        icons: dump
            .icons
            .iter()
            .enumerate()
            .map(|(i, icon)| IconLayer {
                file: icon_file_name(i),
                x: icon.x,
                y: icon.y,
                width: icon.width(),
                height: icon.height(),
            })
            .collect(),
        icon_drop_shadow: dump.icon_drop_shadow,
    };
    let title = dir.join("02_title.json");
    std::fs::write(&title, serde_json::to_string_pretty(&info)?)?;
    written.push(title);

    for (i, icon) in dump.icons.iter().enumerate() {
        let path = dir.join(icon_file_name(i));
        icon.bitmap.save_with_format(&path, ImageFormat::Png)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{disc_rgba, solid_rgba};
    use image::DynamicImage;
    use tempfile::TempDir;

    fn thumb(color: [u8; 3]) -> Thumbnail {
        Thumbnail::new(RgbImage::from_pixel(16, 9, image::Rgb(color)))
    }

    #[test]
    fn png_bytes_decode_back_to_same_pixels() {
        let t = thumb([10, 200, 30]);
        let bytes = t.to_png_bytes().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(&decoded, t.image());
    }

    #[test]
    fn data_url_has_png_prefix() {
        let url = thumb([0, 0, 0]).to_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn digest_tracks_pixels() {
        let a = thumb([1, 2, 3]);
        assert_eq!(a.digest(), thumb([1, 2, 3]).digest());
        assert_ne!(a.digest(), thumb([1, 2, 4]).digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn save_png_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/nested/thumb.png");
        thumb([5, 5, 5]).save_png(&path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (16, 9));
    }

    #[test]
    fn layers_dir_sits_next_to_output() {
        assert_eq!(
            layers_dir_for(Path::new("/out/promo.png")),
            PathBuf::from("/out/promo_layers")
        );
        assert_eq!(layers_dir_for(Path::new("promo")), PathBuf::from("promo_layers"));
    }

    #[test]
    fn write_layers_dumps_background_title_and_icons() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("promo_layers");
        let background = DynamicImage::ImageRgba8(solid_rgba(32, 18, [9, 9, 9, 255])).to_rgb8();
        let layout = TitleLayoutResult {
            font_size_pt: 60.0,
            font_size_px: 80,
            lines: vec!["Hello".into(), "World".into()],
            line_height_px: 60,
            line_spacing_px: 18,
            line_origins: vec![(10, 20), (12, 98)],
            breaking: LineBreaking::Greedy,
        };
        let icons = vec![
            IconPlacement {
                bitmap: disc_rgba(8, [255, 0, 0]),
                x: 3,
                y: 4,
            },
            IconPlacement {
                bitmap: disc_rgba(6, [0, 255, 0]),
                x: 20,
                y: 5,
            },
        ];
        let shadow = ShadowSpec::standard();
        let inner = InnerShadowSpec::standard();
        let dump = LayerDump {
            background: &background,
            title: "Hello World",
            title_layout: &layout,
            font: "built-in",
            text_color: [255, 255, 255],
            text_drop_shadow: &shadow,
            text_inner_shadow: &inner,
            icons: &icons,
            icon_drop_shadow: &shadow,
        };

        let written = write_layers(&dir, &dump).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["01_background.png", "02_title.json", "03_icon_01.png", "03_icon_02.png"]
        );

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("02_title.json")).unwrap()).unwrap();
        assert_eq!(json["text"], "Hello World");
        assert_eq!(json["font_size_px"], 80);
        assert_eq!(json["color"], "#ffffff");
        assert_eq!(json["lines"][1]["text"], "World");
        assert_eq!(json["lines"][1]["y"], 98);
        assert_eq!(json["breaking"], "greedy");
        assert_eq!(json["drop_shadow"]["offset_px"], 12);
        assert_eq!(json["icons"][1]["file"], "03_icon_02.png");

        let icon = image::open(dir.join("03_icon_01.png")).unwrap();
        assert_eq!((icon.width(), icon.height()), (8, 8));
    }
}
