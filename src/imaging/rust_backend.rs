//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | Resize | `image::DynamicImage::resize` with `Lanczos3` filter |
//! | Thumbnail crop | `image::DynamicImage::resize_to_fill` |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder` (quality honoured) |
//! | Encode AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6, quality honoured) |
//! | Encode PNG, GIF, TIFF, WebP | `image::DynamicImage::save_with_format` (lossless, quality ignored) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ResizeParams, ThumbnailParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Output extensions and the format each one is written as.
const OUTPUT_FORMATS: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("avif", ImageFormat::Avif),
];

/// Resolve the output format for an extension (case-insensitive).
fn output_format(extension: &str) -> Option<ImageFormat> {
    OUTPUT_FORMATS
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, fmt)| *fmt)
        .filter(|fmt| fmt.writing_enabled())
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
///
/// Uploads are staged under temporary names without a meaningful extension,
/// so the format is sniffed from the file contents.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Save a DynamicImage to the given path, inferring format from extension.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let format = output_format(ext).ok_or_else(|| {
        BackendError::ProcessingFailed(format!("Unsupported output format: {}", ext))
    })?;

    match format {
        ImageFormat::Jpeg => save_jpeg(img, path, quality),
        ImageFormat::Avif => save_avif(img, path, quality),
        other => img.save_with_format(path, other).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to write {}: {}", path.display(), e))
        }),
    }
}

/// JPEG has no alpha channel, so the image is flattened to RGB first.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let writer = BufWriter::new(File::create(path)?);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality as u8);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

/// Encode and save as AVIF using rav1e (speed=6 for reasonable throughput).
fn save_avif(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let writer = BufWriter::new(File::create(path)?);
    let encoder =
        image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 6, quality as u8);
    img.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("AVIF encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
            })?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let resized = img.resize(params.width, params.height, FilterType::Lanczos3);
        save_image(&resized, &params.output, params.quality.value())
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        // Fill-resize then center-crop to exact dimensions
        let filled =
            img.resize_to_fill(params.crop_width, params.crop_height, FilterType::Lanczos3);
        save_image(&filled, &params.output, params.quality.value())
    }

    fn can_encode(&self, extension: &str) -> bool {
        output_format(extension).is_some()
    }
}
