//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take a target box, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::{Quality, ResizeParams, Size, ThumbnailParams};
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// A file written by an image operation, with its pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Plan a resize operation without executing it.
pub fn plan_resize(source: &Path, output: &Path, size: Size, quality: Quality) -> ResizeParams {
    ResizeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width: size.width,
        height: size.height,
        quality,
    }
}

/// Plan a thumbnail operation without executing it.
pub fn plan_thumbnail(
    source: &Path,
    output: &Path,
    size: Size,
    quality: Quality,
) -> ThumbnailParams {
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        crop_width: size.width,
        crop_height: size.height,
        quality,
    }
}

/// Resize `source` to fit inside `size` and encode it at `output`.
///
/// `original_dims` is the source size, used to report the written dimensions.
pub fn create_resized(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    original_dims: (u32, u32),
    size: Size,
    quality: Quality,
) -> Result<GeneratedImage> {
    backend.resize(&plan_resize(source, output, size, quality))?;
    let (width, height) = calculate_fit_dimensions(original_dims, (size.width, size.height));
    Ok(GeneratedImage {
        path: output.to_path_buf(),
        width,
        height,
    })
}

/// Create a thumbnail cropped to exactly `size`.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    size: Size,
    quality: Quality,
) -> Result<GeneratedImage> {
    backend.thumbnail(&plan_thumbnail(source, output, size, quality))?;
    Ok(GeneratedImage {
        path: output.to_path_buf(),
        width: size.width,
        height: size.height,
    })
}
