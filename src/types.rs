//! Shared types passed between pipeline stages.
//!
//! Every value here is created fresh per compositing request and dropped once
//! the finished canvas has been handed back. Nothing is persisted.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::imaging::SourceError;

/// Output canvas width in pixels. Every finished thumbnail has this width.
pub const CANVAS_WIDTH: u32 = 1920;
/// Output canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 1080;

/// Where an input image comes from.
///
/// Parsed from user strings via [`FromStr`]:
/// - `http://…` / `https://…` → [`ImageSource::RemoteUrl`]
/// - `data:<mime>;base64,<payload>` → [`ImageSource::EncodedBytes`]
/// - anything else → [`ImageSource::LocalPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    LocalPath(PathBuf),
    RemoteUrl(String),
    EncodedBytes(Vec<u8>),
}

impl ImageSource {
    /// Short identifier used in error messages and progress output.
    ///
    /// Encoded buffers have no name, so they are identified by their length.
    pub fn identifier(&self) -> String {
        match self {
            ImageSource::LocalPath(path) => path.display().to_string(),
            ImageSource::RemoteUrl(url) => url.clone(),
            ImageSource::EncodedBytes(bytes) => format!("<{} encoded bytes>", bytes.len()),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl FromStr for ImageSource {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(ImageSource::RemoteUrl(s.to_string()));
        }
        if let Some(rest) = s.strip_prefix("data:") {
            let (header, payload) = rest.split_once(',').ok_or_else(|| SourceError::Decode {
                source_id: "data URL".into(),
                reason: "missing ',' separator".into(),
            })?;
            if !header.ends_with(";base64") {
                return Err(SourceError::Decode {
                    source_id: "data URL".into(),
                    reason: "only base64 data URLs are supported".into(),
                });
            }
            let bytes = STANDARD
                .decode(payload.trim())
                .map_err(|e| SourceError::Decode {
                    source_id: "data URL".into(),
                    reason: e.to_string(),
                })?;
            return Ok(ImageSource::EncodedBytes(bytes));
        }
        Ok(ImageSource::LocalPath(PathBuf::from(s)))
    }
}

/// Which branch of the title sizing algorithm produced the final lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineBreaking {
    /// Greedy wrap at some rung of the size ladder fit in two lines.
    Greedy,
    /// Ladder exhausted; words split near the midpoint.
    MidpointSplit,
    /// Midpoint split overflowed; greedy first line, filled second line.
    NaiveTwoLine,
}

/// Result of the dynamic title layout.
///
/// `lines.len()` is always 1 or 2, and `font_size_px` always lies between the
/// pixel sizes of the smallest and largest rung of the size ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleLayoutResult {
    /// Chosen size in points (before the 96 DPI conversion).
    pub font_size_pt: f64,
    pub font_size_px: u32,
    pub lines: Vec<String>,
    /// Ink height of a reference string at the chosen size.
    pub line_height_px: u32,
    /// Gap between consecutive lines.
    pub line_spacing_px: u32,
    /// Top-left origin of each line, horizontally centered on the canvas.
    pub line_origins: Vec<(i32, i32)>,
    pub breaking: LineBreaking,
}

impl TitleLayoutResult {
    /// Total height of the text block: lines plus the gaps between them.
    pub fn block_height(&self) -> u32 {
        let n = self.lines.len() as u32;
        n * self.line_height_px + n.saturating_sub(1) * self.line_spacing_px
    }
}

/// One icon, scaled and positioned on the canvas.
#[derive(Debug, Clone)]
pub struct IconPlacement {
    pub bitmap: RgbaImage,
    pub x: i32,
    pub y: i32,
}

impl IconPlacement {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}

/// Placements for the whole icon row.
#[derive(Debug, Clone, Default)]
pub struct IconLayoutResult {
    pub placements: Vec<IconPlacement>,
    /// Per-icon bounding box edge chosen from the icon count.
    pub box_size: u32,
    pub spacing: u32,
    /// Top of the row; each icon is centered against the tallest one below it.
    pub row_y: i32,
    /// Icons that did not fit inside the canvas and were left out.
    pub skipped: usize,
}

impl IconLayoutResult {
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Horizontal extent of the placed icons, gaps included.
    pub fn row_width(&self) -> u32 {
        match (self.placements.first(), self.placements.last()) {
            (Some(first), Some(last)) => (last.x + last.width() as i32 - first.x).max(0) as u32,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_remote_urls() {
        let src: ImageSource = "https://example.com/bg.jpg".parse().unwrap();
        assert_eq!(
            src,
            ImageSource::RemoteUrl("https://example.com/bg.jpg".into())
        );
        let src: ImageSource = "http://example.com/a.png".parse().unwrap();
        assert!(matches!(src, ImageSource::RemoteUrl(_)));
    }

    #[test]
    fn parse_local_path() {
        let src: ImageSource = "photos/background.jpg".parse().unwrap();
        assert_eq!(
            src,
            ImageSource::LocalPath(PathBuf::from("photos/background.jpg"))
        );
    }

    #[test]
    fn parse_base64_data_url() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG"));
        let src: ImageSource = url.parse().unwrap();
        assert_eq!(src, ImageSource::EncodedBytes(b"\x89PNG".to_vec()));
    }

    #[test]
    fn parse_data_url_without_base64_is_rejected() {
        let result = "data:text/plain,hello".parse::<ImageSource>();
        assert!(matches!(result, Err(SourceError::Decode { .. })));
    }

    #[test]
    fn parse_malformed_base64_is_rejected() {
        let result = "data:image/png;base64,@@@".parse::<ImageSource>();
        assert!(matches!(result, Err(SourceError::Decode { .. })));
    }

    #[test]
    fn encoded_identifier_reports_length() {
        let src = ImageSource::EncodedBytes(vec![0; 12]);
        assert_eq!(src.identifier(), "<12 encoded bytes>");
    }

    #[test]
    fn block_height_includes_gaps() {
        let layout = TitleLayoutResult {
            font_size_pt: 60.0,
            font_size_px: 80,
            lines: vec!["a".into(), "b".into()],
            line_height_px: 100,
            line_spacing_px: 30,
            line_origins: vec![(0, 0), (0, 130)],
            breaking: LineBreaking::Greedy,
        };
        assert_eq!(layout.block_height(), 230);
    }
}
