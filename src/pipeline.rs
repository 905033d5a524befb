//! Compositing pipeline: one request in, one finished thumbnail out.
//!
//! ```text
//! title check ─▶ resolve background ─▶ normalize ─▶ lay out title
//!      ─▶ title shadows ─▶ draw title ─▶ resolve icons ─▶ lay out icons
//!      ─▶ icon shadows ─▶ paste icons ─▶ flatten ─▶ export
//! ```
//!
//! Every stage is a pure function of the bitmaps handed to it; the [`Engine`]
//! only holds configuration, the source resolver and the loaded font face, so
//! one engine can serve many requests, including concurrently.
//!
//! A failing stage aborts the request and nothing is written. The one local
//! recovery is a failing icon source: that icon is dropped with a warning and
//! the row is laid out from the icons that did resolve.
//!
//! Progress is reported through an optional `mpsc::Sender<PipelineEvent>`;
//! formatting lives in [`crate::output`].

use image::{DynamicImage, RgbImage};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::{ConfigError, EngineConfig};
use crate::export::{ExportError, LayerDump, Thumbnail, layers_dir_for, write_layers};
use crate::icons::layout_icons;
use crate::imaging::mask::darken;
use crate::imaging::{Fetcher, HttpFetcher, SourceError, SourceResolver, normalize_background};
use crate::shadow::{
    TEXT_COLOR, TitleMasks, draw_title, paste_icons, render_icon_drop_shadow,
    render_text_drop_shadow, render_text_inner_shadow,
};
use crate::title::{LayoutError, layout_title};
use crate::types::{
    CANVAS_HEIGHT, CANVAS_WIDTH, IconLayoutResult, ImageSource, LineBreaking, TitleLayoutResult,
};
use crate::typography::Typeface;

/// Pipeline stages that can fail, carried by errors for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    LoadFont,
    ResolveBackground,
    LayoutTitle,
    ResolveIcons,
    Flatten,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::LoadFont => "load font",
            Stage::ResolveBackground => "resolve background",
            Stage::LayoutTitle => "lay out title",
            Stage::ResolveIcons => "resolve icons",
            Stage::Flatten => "flatten",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{stage}: source unavailable: {source_id}: {reason}")]
    SourceUnavailable {
        stage: Stage,
        source_id: String,
        reason: String,
    },
    #[error("{stage}: source not found: {}", path.display())]
    SourceNotFound { stage: Stage, path: PathBuf },
    #[error("{stage}: could not decode {source_id}: {reason}")]
    DecodeError {
        stage: Stage,
        source_id: String,
        reason: String,
    },
    #[error("title is missing")]
    TitleMissing,
    #[error("{stage}: layout impossible: {reason}")]
    LayoutImpossible { stage: Stage, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("{stage}: internal error: {reason}")]
    Internal { stage: Stage, reason: String },
}

impl EngineError {
    /// Attach stage context to a resolver failure for `source`.
    pub fn from_source(stage: Stage, source: &ImageSource, err: SourceError) -> Self {
        match err {
            SourceError::NotFound(path) => EngineError::SourceNotFound { stage, path },
            SourceError::Unavailable { source_id, reason } => EngineError::SourceUnavailable {
                stage,
                source_id,
                reason,
            },
            SourceError::Decode { source_id, reason } => EngineError::DecodeError {
                stage,
                source_id,
                reason,
            },
            SourceError::Io(e) => EngineError::SourceUnavailable {
                stage,
                source_id: source.identifier(),
                reason: e.to_string(),
            },
        }
    }

    fn internal(stage: Stage, reason: impl fmt::Display) -> Self {
        EngineError::Internal {
            stage,
            reason: reason.to_string(),
        }
    }

    /// The stage that failed, if the error is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            EngineError::SourceUnavailable { stage, .. }
            | EngineError::SourceNotFound { stage, .. }
            | EngineError::DecodeError { stage, .. }
            | EngineError::LayoutImpossible { stage, .. }
            | EngineError::Internal { stage, .. } => Some(*stage),
            EngineError::TitleMissing | EngineError::InvalidConfig(_) => None,
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            EngineError::SourceUnavailable { .. }
                | EngineError::SourceNotFound { .. }
                | EngineError::DecodeError { .. }
                | EngineError::TitleMissing
                | EngineError::InvalidConfig(_)
        )
    }
}

/// Progress reported while a request runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    BackgroundReady {
        source: String,
        original: (u32, u32),
    },
    TitleLaidOut {
        font_size_pt: f64,
        font_size_px: u32,
        lines: Vec<String>,
        breaking: LineBreaking,
    },
    IconDropped {
        index: usize,
        source: String,
        reason: String,
    },
    IconsPlaced {
        placed: usize,
        box_size: u32,
        skipped: usize,
    },
    Finished {
        digest: String,
        path: Option<PathBuf>,
        elapsed: Duration,
    },
}

/// Where the finished thumbnail goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// Keep the result in memory only.
    Memory,
    /// Write a PNG to `path`, plus the layer dump when `layers` is set.
    Png { path: PathBuf, layers: bool },
}

/// An icon source that failed to resolve and was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedIcon {
    pub index: usize,
    pub source: String,
    pub reason: String,
}

/// What happened during a request.
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub background_size: (u32, u32),
    pub title: TitleLayoutResult,
    pub font: String,
    pub icons_placed: usize,
    pub icons_skipped: usize,
    pub icon_box: u32,
    /// Left edge of the first placed icon to right edge of the last.
    pub icon_row_width: u32,
    pub dropped_icons: Vec<DroppedIcon>,
    pub digest: String,
    pub elapsed: Duration,
}

/// Result of a successful request.
#[derive(Debug, Clone)]
pub struct OutputArtifacts {
    pub thumbnail: Thumbnail,
    /// PNG written for [`OutputSink::Png`].
    pub path: Option<PathBuf>,
    /// Layer dump directory, when requested.
    pub layers_dir: Option<PathBuf>,
    pub report: RenderReport,
}

/// Intermediate results kept for the layer dump and the report.
struct Composition {
    title_text: String,
    background: RgbImage,
    background_size: (u32, u32),
    title: TitleLayoutResult,
    icons: IconLayoutResult,
    dropped_icons: Vec<DroppedIcon>,
    thumbnail: Thumbnail,
}

fn emit(events: &Option<Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// The thumbnail compositor.
pub struct Engine<F: Fetcher = HttpFetcher> {
    config: EngineConfig,
    resolver: SourceResolver<F>,
    face: Typeface,
}

impl Engine<HttpFetcher> {
    /// Engine that fetches remote sources over HTTP.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let resolver = SourceResolver::http(config.sources.limits())
            .map_err(|e| EngineError::internal(Stage::Setup, e))?;
        Self::with_resolver(config, resolver)
    }
}

impl<F: Fetcher> Engine<F> {
    /// Engine over a caller-supplied resolver.
    pub fn with_resolver(config: EngineConfig, resolver: SourceResolver<F>) -> Result<Self, EngineError> {
        config.validate()?;
        let face = Typeface::resolve(&config.title.font_chain())
            .map_err(|e| EngineError::internal(Stage::LoadFont, e))?;
        Ok(Self {
            config,
            resolver,
            face,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn typeface(&self) -> &Typeface {
        &self.face
    }

    pub fn resolver(&self) -> &SourceResolver<F> {
        &self.resolver
    }

    /// Run the title layout alone, without touching any image.
    pub fn layout(&self, title: &str) -> Result<TitleLayoutResult, EngineError> {
        let style = self.config.title.style(CANVAS_WIDTH);
        layout_title(title, &self.face, &style, (CANVAS_WIDTH, CANVAS_HEIGHT)).map_err(|e| match e {
            LayoutError::EmptyTitle => EngineError::TitleMissing,
            LayoutError::NoWidth(_) => EngineError::LayoutImpossible {
                stage: Stage::LayoutTitle,
                reason: e.to_string(),
            },
        })
    }

    /// Composite a thumbnail in memory.
    pub fn render(
        &self,
        background: &ImageSource,
        title: &str,
        icons: &[ImageSource],
    ) -> Result<Thumbnail, EngineError> {
        Ok(self
            .generate(background, title, icons, &OutputSink::Memory, None)?
            .thumbnail)
    }

    /// Composite a thumbnail and deliver it to `sink`.
    ///
    /// Files are only written once the whole canvas has been composited.
    pub fn generate(
        &self,
        background: &ImageSource,
        title: &str,
        icons: &[ImageSource],
        sink: &OutputSink,
        events: Option<Sender<PipelineEvent>>,
    ) -> Result<OutputArtifacts, EngineError> {
        let started = Instant::now();
        let composition = self.compose(background, title, icons, &events)?;

        let (path, layers_dir) = match sink {
            OutputSink::Memory => (None, None),
            OutputSink::Png { path, layers } => {
                let layers_dir = self.export(&composition, path, *layers)?;
                (Some(path.clone()), layers_dir)
            }
        };

        let digest = composition.thumbnail.digest();
        let elapsed = started.elapsed();
        tracing::info!(
            digest = %digest,
            path = ?path,
            elapsed_ms = elapsed.as_millis() as u64,
            "thumbnail finished"
        );
        emit(
            &events,
            PipelineEvent::Finished {
                digest: digest.clone(),
                path: path.clone(),
                elapsed,
            },
        );

        let report = RenderReport {
            background_size: composition.background_size,
            font: self.face.origin().to_string(),
            icons_placed: composition.icons.placements.len(),
            icons_skipped: composition.icons.skipped,
            icon_box: composition.icons.box_size,
            icon_row_width: composition.icons.row_width(),
            dropped_icons: composition.dropped_icons,
            title: composition.title,
            digest,
            elapsed,
        };
        Ok(OutputArtifacts {
            thumbnail: composition.thumbnail,
            path,
            layers_dir,
            report,
        })
    }

    fn compose(
        &self,
        background: &ImageSource,
        title: &str,
        icons: &[ImageSource],
        events: &Option<Sender<PipelineEvent>>,
    ) -> Result<Composition, EngineError> {
        if title.trim().is_empty() {
            return Err(EngineError::TitleMissing);
        }
        let canvas = (CANVAS_WIDTH, CANVAS_HEIGHT);
        let effects = &self.config.effects;

        let source = self
            .resolver
            .resolve(background)
            .map_err(|e| EngineError::from_source(Stage::ResolveBackground, background, e))?;
        let background_size = (source.width(), source.height());
        let bg = normalize_background(
            &source,
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
            self.config.background.blur_radius,
        );
        drop(source);
        emit(
            events,
            PipelineEvent::BackgroundReady {
                source: background.identifier(),
                original: background_size,
            },
        );

        let layout = self.layout(title)?;
        emit(
            events,
            PipelineEvent::TitleLaidOut {
                font_size_pt: layout.font_size_pt,
                font_size_px: layout.font_size_px,
                lines: layout.lines.clone(),
                breaking: layout.breaking,
            },
        );

        let mut frame = DynamicImage::ImageRgb8(bg.clone()).to_rgba8();
        let masks = TitleMasks::render(&self.face, &layout);
        darken(&mut frame, &render_text_drop_shadow(&masks, &effects.text.drop_shadow, canvas));
        darken(&mut frame, &render_text_inner_shadow(&masks, &effects.text.inner_shadow, canvas));
        draw_title(&mut frame, &masks);

        let mut decoded = Vec::with_capacity(icons.len());
        let mut dropped_icons = Vec::new();
        for (index, icon) in icons.iter().enumerate() {
            match self.resolver.resolve(icon) {
                Ok(image) => decoded.push(image),
                Err(e) => {
                    tracing::warn!(index, source = %icon, error = %e, "dropping icon");
                    let dropped = DroppedIcon {
                        index,
                        source: icon.identifier(),
                        reason: e.to_string(),
                    };
                    emit(
                        events,
                        PipelineEvent::IconDropped {
                            index,
                            source: dropped.source.clone(),
                            reason: dropped.reason.clone(),
                        },
                    );
                    dropped_icons.push(dropped);
                }
            }
        }

        let row = layout_icons(&decoded, CANVAS_WIDTH, CANVAS_HEIGHT);
        drop(decoded);
        if !row.is_empty() {
            darken(
                &mut frame,
                &render_icon_drop_shadow(&row.placements, &effects.icons.drop_shadow, canvas),
            );
            paste_icons(&mut frame, &row.placements);
        }
        emit(
            events,
            PipelineEvent::IconsPlaced {
                placed: row.placements.len(),
                box_size: row.box_size,
                skipped: row.skipped,
            },
        );

        let flat = DynamicImage::ImageRgba8(frame).to_rgb8();
        if flat.dimensions() != canvas {
            return Err(EngineError::internal(
                Stage::Flatten,
                format!("canvas is {:?}, expected {:?}", flat.dimensions(), canvas),
            ));
        }

        Ok(Composition {
            title_text: title.trim().to_string(),
            background: bg,
            background_size,
            title: layout,
            icons: row,
            dropped_icons,
            thumbnail: Thumbnail::new(flat),
        })
    }

    /// Write the layer dump (when asked) and then the PNG. A failure removes
    /// any layer directory this call created, so nothing is left behind.
    fn export(&self, composition: &Composition, path: &Path, layers: bool) -> Result<Option<PathBuf>, EngineError> {
        let dir = layers.then(|| layers_dir_for(path));
        let created = dir.as_ref().filter(|d| !d.exists()).cloned();

        let written = dir
            .as_ref()
            .map(|dir| self.write_layer_dump(composition, dir))
            .transpose()
            .and_then(|_| composition.thumbnail.save_png(path));

        if let Err(e) = written {
            if let Some(created) = created {
                if let Err(cleanup) = std::fs::remove_dir_all(&created) {
                    tracing::warn!(dir = %created.display(), error = %cleanup, "could not remove partial layer dump");
                }
            }
            return Err(EngineError::internal(Stage::Export, e));
        }
        Ok(dir)
    }

    fn write_layer_dump(&self, composition: &Composition, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        let effects = &self.config.effects;
        let dump = LayerDump {
            background: &composition.background,
            title: &composition.title_text,
            title_layout: &composition.title,
            font: self.face.origin(),
            text_color: TEXT_COLOR,
            text_drop_shadow: &effects.text.drop_shadow,
            text_inner_shadow: &effects.text.inner_shadow,
            icons: &composition.icons.placements,
            icon_drop_shadow: &effects.icons.drop_shadow,
        };
        write_layers(dir, &dump)
    }
}
