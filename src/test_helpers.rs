//! Shared test utilities.
//!
//! Synthetic images and staged uploads, so tests never depend on fixture
//! files or on a host web framework.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let upload = stage_jpeg_upload(tmp.path(), "photo.jpg", 500, 500);
//! assert_eq!(upload.extension, "jpg");
//! ```

use crate::upload::UploadedFile;
use image::{ImageEncoder, RgbImage};
use std::path::Path;

/// Write a small valid JPEG with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Stage a JPEG the way a host would: under a temp name with no image
/// extension, paired with the client's file name.
pub fn stage_jpeg_upload(dir: &Path, client_name: &str, width: u32, height: u32) -> UploadedFile {
    let staged = dir.join("php4Xa9z.tmp");
    create_test_jpeg(&staged, width, height);
    UploadedFile::new(staged, client_name)
}
