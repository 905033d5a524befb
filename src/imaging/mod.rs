//! Image processing in pure Rust on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with format sniffing |
//! | **Fetch** | `reqwest` blocking client behind [`Fetcher`] |
//! | **Background** | Lanczos3 cover-fit + `fast_blur` |
//! | **Shadows** | single-channel [`mask::Mask`] planes, `fast_blur` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for canvas geometry (unit testable)
//! - **Parameters**: Data structures describing shadow passes and sizing
//! - **Source**: [`SourceResolver`] + [`Fetcher`] trait + [`HttpFetcher`]
//! - **Operations**: High-level functions combining calculations + `image`
//! - **Mask**: Alpha-plane helpers used by the shadow renderer

pub mod calculations;
pub mod mask;
pub mod operations;
mod params;
pub mod source;

pub use calculations::TitleAnchors;
pub use operations::{normalize_background, scale_icon};
pub use params::{InnerShadowLayer, InnerShadowSpec, ShadowLayer, ShadowSpec, TitleLadder};
pub use source::{Fetcher, HttpFetcher, SourceError, SourceLimits, SourceResolver, decode_bytes};
