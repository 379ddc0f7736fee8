//! Per-step output handlers.
//!
//! A step either copies the upload verbatim (no handler), runs a declarative
//! [`ImagePolicy`] through the image backend, or hands the files to a custom
//! function. The two handler shapes are a closed enum; there is no runtime
//! shape inspection.
//!
//! ## Policy outputs
//!
//! For stored name `photo.jpg` in folder `dir/`:
//!
//! ```text
//! dir/photo.jpg            resized to fit `size`, encoded at `quality`
//! dir/thumb_photo.jpg      fill + crop to `thumbnail.size` (optional)
//! dir/original_photo.jpg   byte copy of the upload (optional)
//! ```

use crate::imaging::{
    GeneratedImage, ImageBackend, Quality, Size, create_resized, create_thumbnail, get_dimensions,
};
use crate::naming::StoredFileName;
use crate::paths::TargetDirectory;
use crate::pipeline::UploadError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Error type custom handlers return.
pub type HandlerFailure = Box<dyn std::error::Error + Send + Sync>;

/// Custom handler: `(temp file, full destination path, destination folder)`.
pub type CustomFn = dyn Fn(&Path, &Path, &Path) -> Result<(), HandlerFailure> + Send + Sync;

/// What a step does with the upload.
#[derive(Clone)]
pub enum HandlerSpec {
    Custom(Arc<CustomFn>),
    Policy(ImagePolicy),
}

impl HandlerSpec {
    pub fn custom(
        f: impl Fn(&Path, &Path, &Path) -> Result<(), HandlerFailure> + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(Arc::new(f))
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
            Self::Policy(p) => f.debug_tuple("Policy").field(p).finish(),
        }
    }
}

/// Declarative resize/thumbnail/original policy.
///
/// In config files:
///
/// ```toml
/// [steps.policy]
/// size = [400, 400]
/// quality = 80
/// thumbnail_size = [100, 100]   # optional
/// thumbnail_quality = 70        # optional, defaults to `quality`
/// save_original = true          # optional
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagePolicy {
    pub size: Size,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_quality: Option<u32>,
    #[serde(default)]
    pub save_original: bool,
}

fn default_quality() -> u32 {
    Quality::default().value()
}

impl ImagePolicy {
    pub fn new(size: Size, quality: u32) -> Self {
        Self {
            size,
            quality,
            thumbnail_size: None,
            thumbnail_quality: None,
            save_original: false,
        }
    }

    pub fn with_thumbnail(mut self, size: Size, quality: Option<u32>) -> Self {
        self.thumbnail_size = Some(size);
        self.thumbnail_quality = quality;
        self
    }

    pub fn saving_original(mut self) -> Self {
        self.save_original = true;
        self
    }

    /// Thumbnail quality, falling back to the main quality.
    pub fn effective_thumbnail_quality(&self) -> Quality {
        Quality::new(self.thumbnail_quality.unwrap_or(self.quality))
    }

    /// Check sizes and qualities; `context` prefixes the message.
    pub fn validate(&self, context: &str) -> Result<(), String> {
        if self.size.is_empty() {
            return Err(format!("{context}.size must be non-zero"));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(format!("{context}.quality must be 1-100"));
        }
        if self.thumbnail_size.is_some_and(|s| s.is_empty()) {
            return Err(format!("{context}.thumbnail_size must be non-zero"));
        }
        if self
            .thumbnail_quality
            .is_some_and(|q| !(1..=100).contains(&q))
        {
            return Err(format!("{context}.thumbnail_quality must be 1-100"));
        }
        Ok(())
    }
}

/// File name prefixes for derived outputs.
#[derive(Debug, Clone, Copy)]
pub struct Prefixes<'a> {
    pub thumbnail: &'a str,
    pub original: &'a str,
}

/// How a file under a step directory was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Copy,
    Resized,
    Thumbnail,
    Original,
    Custom,
}

/// One file a step wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub kind: OutputKind,
    pub path: PathBuf,
    /// Pixel size for resized images and thumbnails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<(u32, u32)>,
}

impl From<(OutputKind, GeneratedImage)> for WrittenFile {
    fn from((kind, image): (OutputKind, GeneratedImage)) -> Self {
        Self {
            kind,
            path: image.path,
            dimensions: Some((image.width, image.height)),
        }
    }
}

/// Copy the upload byte-for-byte.
pub fn copy_upload(tmp_file: &Path, destination: &Path) -> Result<(), UploadError> {
    std::fs::copy(tmp_file, destination).map_err(|source| UploadError::Write {
        path: destination.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Run a step's handler against the upload.
///
/// `step` is the step index, used only in error messages.
pub fn execute_handler(
    backend: &impl ImageBackend,
    handler: &HandlerSpec,
    step: usize,
    tmp_file: &Path,
    folder: &TargetDirectory,
    stored_name: &StoredFileName,
    prefixes: Prefixes<'_>,
) -> Result<Vec<WrittenFile>, UploadError> {
    let destination = PathBuf::from(folder.file(stored_name.as_str()));

    match handler {
        HandlerSpec::Custom(f) => {
            debug!(step, destination = %destination.display(), "running custom handler");
            f(tmp_file, &destination, folder.as_path()).map_err(|e| UploadError::Handler {
                step,
                message: e.to_string(),
            })?;
            Ok(vec![WrittenFile {
                kind: OutputKind::Custom,
                path: destination,
                dimensions: None,
            }])
        }
        HandlerSpec::Policy(policy) => {
            let extension = stored_name.extension();
            if !backend.can_encode(extension) {
                return Err(UploadError::ImageSupportUnavailable {
                    extension: extension.to_string(),
                });
            }

            let mut written = Vec::new();
            let original_dims = get_dimensions(backend, tmp_file)?;

            debug!(step, size = %policy.size, quality = policy.quality, "resizing upload");
            let resized = create_resized(
                backend,
                tmp_file,
                &destination,
                original_dims,
                policy.size,
                Quality::new(policy.quality),
            )?;
            written.push((OutputKind::Resized, resized).into());

            if let Some(size) = policy.thumbnail_size {
                let output = PathBuf::from(folder.file(&stored_name.prefixed(prefixes.thumbnail)));
                debug!(step, %size, "creating thumbnail");
                let thumb = create_thumbnail(
                    backend,
                    tmp_file,
                    &output,
                    size,
                    policy.effective_thumbnail_quality(),
                )?;
                written.push((OutputKind::Thumbnail, thumb).into());
            }

            if policy.save_original {
                let output = PathBuf::from(folder.file(&stored_name.prefixed(prefixes.original)));
                copy_upload(tmp_file, &output)?;
                written.push(WrittenFile {
                    kind: OutputKind::Original,
                    path: output,
                    dimensions: Some(original_dims),
                });
            }

            Ok(written)
        }
    }
}
