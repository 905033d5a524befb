//! Engine configuration module.
//!
//! Handles loading, validating, and merging `thumbforge.toml` files. Stock
//! defaults reproduce the stock thumbnail look; a user file overrides them
//! key by key.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [background]
//! blur_radius = 20            # Gaussian blur applied after cover-fit
//!
//! [title]
//! size_initial_pt = 158.52    # First rung of the size ladder
//! size_min_pt = 60.0          # Last rung
//! size_step_pt = 6.0          # Shrink per attempt
//! max_width_fraction = 0.85   # Text box width relative to the canvas
//! line_spacing_fraction = 0.3 # Gap between lines relative to line height
//! anchor_single_line = 0.38   # Block top as a fraction of the free height
//! anchor_two_lines = 0.32
//! fonts = []                  # Font files tried before installed fonts
//! system_fonts = true         # Try installed bold italic faces
//! system_font_paths = [...]   # Where to look for them, most preferred first
//!
//! [effects.text.drop_shadow]
//! opacity = 0.85
//! offset_px = 12
//! blur_radius_px = 40
//! layer_count = 3
//!
//! [effects.text.inner_shadow]
//! opacity = 0.45
//! angle_degrees = 30.0
//! size_fraction = 0.08
//! layer_count = 3
//!
//! [effects.icons.drop_shadow]  # same keys and defaults as the text drop shadow
//!
//! [sources]
//! timeout_secs = 30           # Whole-request timeout for remote images
//! remote_warn_mb = 10         # Warn above this declared download size
//! local_warn_mb = 20          # Warn above this local file size
//!
//! [processing]
//! max_processes = 4           # Batch workers (omit for auto = CPU cores)
//! ```
//!
//! The canvas size is fixed at 1920×1080 and has no key.
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [effects.text.drop_shadow]
//! opacity = 0.6
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::imaging::{InnerShadowSpec, ShadowSpec, SourceLimits, TitleAnchors, TitleLadder};
use crate::title::TitleStyle;
use crate::typography::{FontSource, font_chain};

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "thumbforge.toml";

const MB: u64 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `thumbforge.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub background: BackgroundConfig,
    pub title: TitleConfig,
    pub effects: EffectsConfig,
    pub sources: SourcesConfig,
    pub processing: ProcessingConfig,
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.title;
        if t.size_initial_pt <= 0.0 || t.size_min_pt <= 0.0 || t.size_step_pt <= 0.0 {
            return Err(ConfigError::Validation(
                "title sizes (size_initial_pt, size_min_pt, size_step_pt) must be positive".into(),
            ));
        }
        if t.size_min_pt > t.size_initial_pt {
            return Err(ConfigError::Validation(
                "title.size_min_pt must not exceed title.size_initial_pt".into(),
            ));
        }
        for (key, value) in [
            ("title.max_width_fraction", t.max_width_fraction),
            ("title.anchor_single_line", t.anchor_single_line),
            ("title.anchor_two_lines", t.anchor_two_lines),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Validation(format!("{key} must be in (0, 1]")));
            }
        }
        if !(0.0..=1.0).contains(&t.line_spacing_fraction) {
            return Err(ConfigError::Validation(
                "title.line_spacing_fraction must be in [0, 1]".into(),
            ));
        }

        for (key, spec) in [
            ("effects.text.drop_shadow", &self.effects.text.drop_shadow),
            ("effects.icons.drop_shadow", &self.effects.icons.drop_shadow),
        ] {
            validate_shadow(key, spec.opacity, spec.layer_count)?;
        }
        let inner = &self.effects.text.inner_shadow;
        validate_shadow("effects.text.inner_shadow", inner.opacity, inner.layer_count)?;
        if inner.size_fraction < 0.0 {
            return Err(ConfigError::Validation(
                "effects.text.inner_shadow.size_fraction must not be negative".into(),
            ));
        }

        if self.sources.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "sources.timeout_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn validate_shadow(key: &str, opacity: f64, layer_count: u32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(ConfigError::Validation(format!("{key}.opacity must be 0.0-1.0")));
    }
    if layer_count == 0 {
        return Err(ConfigError::Validation(format!("{key}.layer_count must be at least 1")));
    }
    Ok(())
}

/// Background settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    /// Gaussian blur radius applied to the cover-fit background (0 disables).
    pub blur_radius: u32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self { blur_radius: 20 }
    }
}

/// Title sizing, placement, and font selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TitleConfig {
    pub size_initial_pt: f64,
    pub size_min_pt: f64,
    pub size_step_pt: f64,
    pub max_width_fraction: f64,
    pub line_spacing_fraction: f64,
    pub anchor_single_line: f64,
    pub anchor_two_lines: f64,
    /// Font files tried first, in order.
    pub fonts: Vec<PathBuf>,
    /// Whether installed bold italic faces are tried before the built-in one.
    pub system_fonts: bool,
    /// Installed faces to try, most preferred first.
    pub system_font_paths: Vec<PathBuf>,
}

/// Common locations of bold italic sans faces on Linux, macOS and Windows.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation/LiberationSans-BoldItalic.ttf",
    "/usr/share/fonts/truetype/liberation2/LiberationSans-BoldItalic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-BoldOblique.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold Italic.ttf",
    "C:/Windows/Fonts/arialbi.ttf",
];

impl Default for TitleConfig {
    fn default() -> Self {
        let ladder = TitleLadder::default();
        let anchors = TitleAnchors::default();
        Self {
            size_initial_pt: ladder.initial_pt,
            size_min_pt: ladder.min_pt,
            size_step_pt: ladder.step_pt,
            max_width_fraction: 0.85,
            line_spacing_fraction: 0.3,
            anchor_single_line: anchors.single_line,
            anchor_two_lines: anchors.two_lines,
            fonts: Vec::new(),
            system_fonts: true,
            system_font_paths: SYSTEM_FONT_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl TitleConfig {
    pub fn ladder(&self) -> TitleLadder {
        TitleLadder {
            initial_pt: self.size_initial_pt,
            min_pt: self.size_min_pt,
            step_pt: self.size_step_pt,
        }
    }

    /// Layout style for a canvas of the given width.
    pub fn style(&self, canvas_w: u32) -> TitleStyle {
        TitleStyle {
            ladder: self.ladder(),
            max_width_px: (canvas_w as f64 * self.max_width_fraction) as u32,
            line_spacing_fraction: self.line_spacing_fraction,
            anchors: TitleAnchors {
                single_line: self.anchor_single_line,
                two_lines: self.anchor_two_lines,
            },
        }
    }

    /// Ranked font sources for the title face.
    pub fn font_chain(&self) -> Vec<FontSource> {
        let installed: &[PathBuf] = if self.system_fonts {
            &self.system_font_paths
        } else {
            &[]
        };
        font_chain(&self.fonts, installed)
    }
}

/// Shadow parameters per element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectsConfig {
    pub text: TextEffects,
    pub icons: IconEffects,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextEffects {
    pub drop_shadow: ShadowSpec,
    pub inner_shadow: InnerShadowSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconEffects {
    pub drop_shadow: ShadowSpec,
}

/// Limits for resolving input images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub timeout_secs: u64,
    pub remote_warn_mb: u64,
    pub local_warn_mb: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            remote_warn_mb: 10,
            local_warn_mb: 20,
        }
    }
}

impl SourcesConfig {
    pub fn limits(&self) -> SourceLimits {
        SourceLimits {
            timeout: Duration::from_secs(self.timeout_secs),
            remote_warn_bytes: self.remote_warn_mb * MB,
            local_warn_bytes: self.local_warn_mb * MB,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Stock defaults as a TOML value, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(EngineConfig::default())?)
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value in the overlay replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. A missing file is not an error.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto `base`, deserialize, and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EngineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config at `path` layered over stock defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        tracing::debug!(path = %path.display(), "loaded config overrides");
    }
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `thumbforge.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# thumbforge configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.
#
# The output canvas is always 1920x1080.

# ---------------------------------------------------------------------------
# Background
# ---------------------------------------------------------------------------
[background]
# Gaussian blur radius applied after the cover-fit crop. 0 disables the blur.
blur_radius = 20

# ---------------------------------------------------------------------------
# Title
# ---------------------------------------------------------------------------
[title]
# Size ladder in points (converted to pixels at 96 DPI). The title starts at
# size_initial_pt and shrinks by size_step_pt until it fits in two lines;
# size_min_pt is always the last rung.
size_initial_pt = 158.52
size_min_pt = 60.0
size_step_pt = 6.0

# Text box width as a fraction of the canvas width.
max_width_fraction = 0.85

# Gap between the two lines as a fraction of the line height.
line_spacing_fraction = 0.3

# Top of the text block as a fraction of the free vertical space.
anchor_single_line = 0.38
anchor_two_lines = 0.32

# Font files tried first, in order. A bold italic face is recommended.
fonts = []

# Try installed bold italic faces before the built-in one.
system_fonts = true

# Installed faces to try when system_fonts is on, most preferred first.
system_font_paths = [
    "/usr/share/fonts/truetype/liberation/LiberationSans-BoldItalic.ttf",
    "/usr/share/fonts/truetype/liberation2/LiberationSans-BoldItalic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-BoldOblique.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold Italic.ttf",
    "C:/Windows/Fonts/arialbi.ttf",
]

# ---------------------------------------------------------------------------
# Shadows
# ---------------------------------------------------------------------------
# Drop shadows use layer_count copies at offsets falling from offset_px;
# farther copies are fainter and blurrier.
[effects.text.drop_shadow]
opacity = 0.85
offset_px = 12
blur_radius_px = 40
layer_count = 3

# Darker copies nudged toward the light (angle counter-clockwise from +x).
# size_fraction is relative to the font pixel size.
[effects.text.inner_shadow]
opacity = 0.45
angle_degrees = 30.0
size_fraction = 0.08
layer_count = 3

[effects.icons.drop_shadow]
opacity = 0.85
offset_px = 12
blur_radius_px = 40
layer_count = 3

# ---------------------------------------------------------------------------
# Sources
# ---------------------------------------------------------------------------
[sources]
# Whole-request timeout for remote images. Failed fetches are not retried.
timeout_secs = 30

# Warn (without failing) above these sizes, in megabytes.
remote_warn_mb = 10
local_warn_mb = 20

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel batch workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
