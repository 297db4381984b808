//! Pure Rust image codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` |
//! | Thumbnail, inset | `DynamicImage::resize` with `Lanczos3` |
//! | Thumbnail, outbound | `DynamicImage::resize_to_fill` with `Lanczos3` |
//! | Exact resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode → JPEG / PNG | `JpegEncoder::new_with_quality`, `PngEncoder` |
//! | Encode → WebP | `WebPEncoder::new_lossless` |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |

use super::backend::{BackendError, ImageBackend, ImageHandle};
use super::geometry::{Dimensions, Mode, Point};
use super::params::{OutputFormat, Quality};
use image::DynamicImage;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use std::io::Cursor;

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

impl ImageBackend for RustBackend {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn ImageHandle>, BackendError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Box::new(RustImage { image }))
    }

    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(BackendError::Io)?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }
}

struct RustImage {
    image: DynamicImage,
}

impl ImageHandle for RustImage {
    fn size(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    fn thumbnail(
        &self,
        size: Dimensions,
        mode: Mode,
    ) -> Result<Box<dyn ImageHandle>, BackendError> {
        if size.is_empty() {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot resize to {size}"
            )));
        }
        let image = match mode {
            Mode::Inset => self
                .image
                .resize(size.width, size.height, FilterType::Lanczos3),
            Mode::Outbound => {
                self.image
                    .resize_to_fill(size.width, size.height, FilterType::Lanczos3)
            }
        };
        Ok(Box::new(RustImage { image }))
    }

    fn resize(&self, size: Dimensions) -> Result<Box<dyn ImageHandle>, BackendError> {
        if size.is_empty() {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot resize to {size}"
            )));
        }
        let image = self
            .image
            .resize_exact(size.width, size.height, FilterType::Lanczos3);
        Ok(Box::new(RustImage { image }))
    }

    fn crop(&self, start: Point, size: Dimensions) -> Result<Box<dyn ImageHandle>, BackendError> {
        let current = self.size();
        let fits = start.x.checked_add(size.width).is_some_and(|r| r <= current.width)
            && start.y.checked_add(size.height).is_some_and(|b| b <= current.height);
        if size.is_empty() || !fits {
            return Err(BackendError::ProcessingFailed(format!(
                "crop {size} at ({}, {}) is outside the {current} image",
                start.x, start.y
            )));
        }
        let image = self
            .image
            .crop_imm(start.x, start.y, size.width, size.height);
        Ok(Box::new(RustImage { image }))
    }

    fn get(&self, format: &str, quality: Quality) -> Result<Vec<u8>, BackendError> {
        let output = OutputFormat::from_extension(format)
            .ok_or_else(|| BackendError::UnsupportedFormat(format.to_string()))?;
        let mut buffer = Cursor::new(Vec::new());
        // Encoders reject a quality of 0.
        let q = quality.value().max(1);

        let result = match output {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgb8(self.image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, q))
            }
            OutputFormat::Png => self.image.write_with_encoder(PngEncoder::new(&mut buffer)),
            OutputFormat::WebP => {
                let rgba = DynamicImage::ImageRgba8(self.image.to_rgba8());
                rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))
            }
            OutputFormat::Avif => self
                .image
                .write_with_encoder(AvifEncoder::new_with_speed_quality(&mut buffer, 6, q)),
        };
        result.map_err(|e| BackendError::ProcessingFailed(format!("{output} encode failed: {e}")))?;

        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::png_bytes;

    #[test]
    fn identify_synthetic_png() {
        let backend = RustBackend::new();
        let dims = backend.identify(&png_bytes(200, 150)).unwrap();
        assert_eq!(dims, Dimensions::new(200, 150));
    }

    #[test]
    fn load_garbage_is_decode_error() {
        let backend = RustBackend::new();
        let result = backend.load(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn inset_thumbnail_preserves_aspect() {
        let backend = RustBackend::new();
        let image = backend.load(&png_bytes(567, 200)).unwrap();
        let thumb = image
            .thumbnail(Dimensions::new(100, 100), Mode::Inset)
            .unwrap();
        assert_eq!(thumb.size(), Dimensions::new(100, 35));
    }

    #[test]
    fn outbound_thumbnail_fills_exactly() {
        let backend = RustBackend::new();
        let image = backend.load(&png_bytes(400, 300)).unwrap();
        let thumb = image
            .thumbnail(Dimensions::new(90, 90), Mode::Outbound)
            .unwrap();
        assert_eq!(thumb.size(), Dimensions::new(90, 90));
    }

    #[test]
    fn exact_resize_keeps_a_fitted_box() {
        let backend = RustBackend::new();
        let image = backend.load(&png_bytes(567, 200)).unwrap();
        // `resize` would refit 100x35 to 99x35.
        let resized = image.resize(Dimensions::new(100, 35)).unwrap();
        assert_eq!(resized.size(), Dimensions::new(100, 35));
        assert!(image.resize(Dimensions::new(0, 35)).is_err());
    }

    #[test]
    fn crop_inside_bounds() {
        let backend = RustBackend::new();
        let image = backend.load(&png_bytes(120, 100)).unwrap();
        let cropped = image
            .crop(Point::new(10, 0), Dimensions::new(100, 100))
            .unwrap();
        assert_eq!(cropped.size(), Dimensions::new(100, 100));
    }

    #[test]
    fn crop_outside_bounds_errors() {
        let backend = RustBackend::new();
        let image = backend.load(&png_bytes(50, 50)).unwrap();
        let result = image.crop(Point::new(10, 10), Dimensions::new(50, 50));
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn encode_jpeg_round_trips_dimensions() {
        let backend = RustBackend::new();
        let image = backend.load(&png_bytes(64, 48)).unwrap();
        let bytes = image.get("jpg", Quality::new(80)).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(backend.identify(&bytes).unwrap(), Dimensions::new(64, 48));
    }

    #[test]
    fn encode_png_and_webp() {
        let backend = RustBackend::new();
        let image = backend.load(&png_bytes(16, 16)).unwrap();

        let png = image.get("png", Quality::default()).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let webp = image.get("webp", Quality::default()).unwrap();
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn encode_unsupported_format_errors() {
        let backend = RustBackend::new();
        let image = backend.load(&png_bytes(16, 16)).unwrap();
        let result = image.get("bmp", Quality::default());
        assert!(matches!(result, Err(BackendError::UnsupportedFormat(f)) if f == "bmp"));
    }
}
