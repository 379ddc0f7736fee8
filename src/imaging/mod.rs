//! Image processing, pure Rust and statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3 `resize` (fit inside a box) |
//! | **Thumbnail** | `resize_to_fill` (fill + center crop) |
//! | **Encode** | format from the output extension |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::calculate_fit_dimensions;
pub use operations::{GeneratedImage, create_resized, create_thumbnail, get_dimensions};
pub use params::{Quality, ResizeParams, Size, ThumbnailParams};
pub use rust_backend::RustBackend;
