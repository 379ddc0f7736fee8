//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines what the pipeline needs from an image
//! library: identify, resize, thumbnail, and a capability probe for output
//! formats. Everything else (directory handling, naming, copying originals)
//! happens outside the backend.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate and statically linked into the binary.

use super::params::{ResizeParams, ThumbnailParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
pub trait ImageBackend {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Resize to fit inside `width x height`, keeping the aspect ratio.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Fill `crop_width x crop_height`, then center crop to exactly that box.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;

    /// Whether an output file with this extension can be encoded.
    ///
    /// `extension` is compared case-insensitively and has no leading dot.
    fn can_encode(&self, extension: &str) -> bool;
}
