//! # thumbforge
//!
//! Composites fixed-size 1920×1080 blog thumbnails from three inputs: a
//! background photo, a title, and an ordered row of icons.
//!
//! # Architecture: One Request, One Pipeline
//!
//! Every thumbnail is an independent, synchronous computation:
//!
//! ```text
//! 1. Resolve    ImageSource  →  decoded bitmap      (local path, URL, data URL)
//! 2. Normalize  background   →  1920×1080, blurred  (cover fit, never letterboxed)
//! 3. Title      text         →  ≤ 2 centered lines  (shrinking size ladder)
//! 4. Shadows    title masks  →  drop + inner shadow
//! 5. Icons      bitmaps      →  one centered row    (box size by icon count)
//! 6. Flatten    canvas       →  opaque RGB          (PNG, data URL, layer dump)
//! ```
//!
//! The [`pipeline::Engine`] holds only configuration, the source resolver and
//! the loaded font. Bitmaps flow from stage to stage and are dropped when the
//! request ends, so nothing leaks between requests and running several
//! requests at once needs no locking.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | `Engine::generate`: sequences the stages, maps failures to [`pipeline::EngineError`] |
//! | [`imaging`] | Source resolution, cover-fit background, icon scaling, alpha masks, pure geometry |
//! | [`typography`] | Font fallback chain, text measurement, glyph rasterization |
//! | [`title`] | Dynamic title layout: size ladder, greedy wrap, two-line fallback |
//! | [`shadow`] | Multi-layer drop shadows and the simulated inner shadow |
//! | [`icons`] | Icon row layout |
//! | [`export`] | PNG encoding, data-URL previews, the layer dump |
//! | [`batch`] | Job files run in parallel on the rayon pool |
//! | [`config`] | Layered `thumbforge.toml` loading and validation |
//! | [`types`] | Shared value types and the canvas size |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fixed Canvas
//!
//! The output is always 1920×1080. Every placement rule (title anchors, icon
//! row height, box sizes) is tuned for that frame, so the size is a constant
//! rather than a config key.
//!
//! ## Shadows as Alpha Planes
//!
//! All shadows are black. A shadow pass therefore only needs coverage, and
//! each pass renders into a single-channel plane that darkens the canvas
//! before the crisp element is drawn on top. Masks are cropped to their
//! content plus blur padding, so blurring a title line touches a few hundred
//! thousand pixels, not the whole canvas.
//!
//! ## Built-in Font
//!
//! Font lookup walks a ranked list (configured files, then common installed
//! bold italic faces) and always ends in a face compiled into the binary.
//! Rendering never fails for lack of fonts, and tests that disable system
//! fonts are reproducible on any machine.
//!
//! ## Determinism
//!
//! No stage uses randomness, wall-clock time or parallelism inside a request.
//! Byte-identical inputs give byte-identical pixels; [`export::Thumbnail::digest`]
//! makes that easy to check.

pub mod batch;
pub mod config;
pub mod export;
pub mod icons;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod shadow;
pub mod title;
pub mod types;
pub mod typography;

#[cfg(test)]
pub(crate) mod test_helpers;
