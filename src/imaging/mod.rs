//! Image processing: pure Rust, zero system dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Thumbnail** | `resize` (inset) / `resize_to_fill` (outbound), Lanczos3 |
//! | **Exact resize** | `resize_exact`, Lanczos3 |
//! | **Crop** | `crop_imm` |
//! | **Encode** | JPEG, PNG, WebP (lossless), AVIF |
//!
//! The module is split into:
//! - **Geometry**: Pure functions for box math (unit testable)
//! - **Parameters**: Encoding quality and output formats
//! - **Backend**: [`ImageBackend`] / [`ImageHandle`] traits + [`RustBackend`]

pub mod backend;
pub mod geometry;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ImageHandle};
pub use geometry::{
    Dimensions, Mode, Point, center_crop_offset, complete_box, compute_target_box, cover_ratio,
};
pub use params::{OutputFormat, Quality};
pub use rust_backend::RustBackend;
