//! Image codec backend traits and shared types.
//!
//! The [`ImageBackend`] trait decodes bytes into an [`ImageHandle`]; a handle
//! supports the operations resizers need: thumbnail, exact resize, crop,
//! encode (`get`) and size. Handles are immutable: every operation returns a new
//! handle.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust, built on
//! the `image` crate.

use super::geometry::{Dimensions, Mode, Point};
use super::params::Quality;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// A decoded image.
pub trait ImageHandle {
    /// Current size in pixels.
    fn size(&self) -> Dimensions;

    /// Resize into `size`.
    ///
    /// [`Mode::Inset`] fits inside `size` preserving the aspect ratio;
    /// [`Mode::Outbound`] fills `size` and center-crops the overflow.
    fn thumbnail(&self, size: Dimensions, mode: Mode) -> Result<Box<dyn ImageHandle>, BackendError>;

    /// Scale to exactly `size`. Callers pass a box they already fitted.
    fn resize(&self, size: Dimensions) -> Result<Box<dyn ImageHandle>, BackendError>;

    /// Cut out the `size` rectangle whose top-left corner is `start`.
    fn crop(&self, start: Point, size: Dimensions) -> Result<Box<dyn ImageHandle>, BackendError>;

    /// Encode as `format` (a file extension such as `jpg`).
    fn get(&self, format: &str, quality: Quality) -> Result<Vec<u8>, BackendError>;
}

/// Trait for image codec backends.
pub trait ImageBackend: Send + Sync {
    /// Decode raw bytes.
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn ImageHandle>, BackendError>;

    /// Get image dimensions.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        Ok(self.load(bytes)?.size())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::geometry::compute_target_box;
    use std::sync::{Arc, Mutex};

    /// Mock backend that records operations without touching pixels.
    ///
    /// Every decoded handle reports `source` as its size; encoded output is
    /// the text `"<format>:<w>x<h>"` so tests can assert what was written.
    pub struct MockBackend {
        pub source: Dimensions,
        pub fail_decode: bool,
        pub operations: Arc<Mutex<Vec<RecordedOp>>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Load(usize),
        Thumbnail { size: Dimensions, mode: Mode },
        Resize { size: Dimensions },
        Crop { start: Point, size: Dimensions },
        Get {
            format: String,
            quality: u8,
            size: Dimensions,
        },
    }

    impl MockBackend {
        pub fn new(source: Dimensions) -> Self {
            Self {
                source,
                fail_decode: false,
                operations: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail_decode: true,
                ..Self::new(Dimensions::new(1, 1))
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    struct MockHandle {
        size: Dimensions,
        operations: Arc<Mutex<Vec<RecordedOp>>>,
    }

    impl MockHandle {
        fn derive(&self, size: Dimensions) -> Box<dyn ImageHandle> {
            Box::new(MockHandle {
                size,
                operations: Arc::clone(&self.operations),
            })
        }
    }

    impl ImageHandle for MockHandle {
        fn size(&self) -> Dimensions {
            self.size
        }

        fn thumbnail(
            &self,
            size: Dimensions,
            mode: Mode,
        ) -> Result<Box<dyn ImageHandle>, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Thumbnail { size, mode });
            let result = match mode {
                Mode::Inset => {
                    compute_target_box(self.size, Some(size.width), Some(size.height), mode)
                        .map_err(|e| BackendError::ProcessingFailed(e.to_string()))?
                }
                Mode::Outbound => size,
            };
            Ok(self.derive(result))
        }

        fn resize(&self, size: Dimensions) -> Result<Box<dyn ImageHandle>, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Resize { size });
            Ok(self.derive(size))
        }

        fn crop(
            &self,
            start: Point,
            size: Dimensions,
        ) -> Result<Box<dyn ImageHandle>, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Crop { start, size });
            Ok(self.derive(size))
        }

        fn get(&self, format: &str, quality: Quality) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Get {
                format: format.to_string(),
                quality: quality.value(),
                size: self.size,
            });
            Ok(format!("{format}:{}", self.size).into_bytes())
        }
    }

    impl ImageBackend for MockBackend {
        fn load(&self, bytes: &[u8]) -> Result<Box<dyn ImageHandle>, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Load(bytes.len()));
            if self.fail_decode {
                return Err(BackendError::Decode("mock decode failure".to_string()));
            }
            Ok(Box::new(MockHandle {
                size: self.source,
                operations: Arc::clone(&self.operations),
            }))
        }
    }

    #[test]
    fn mock_records_load_and_reports_size() {
        let backend = MockBackend::new(Dimensions::new(800, 600));

        let dims = backend.identify(b"abc").unwrap();
        assert_eq!(dims, Dimensions::new(800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Load(3)]);
    }

    #[test]
    fn mock_thumbnail_then_get() {
        let backend = MockBackend::new(Dimensions::new(400, 200));
        let image = backend.load(b"x").unwrap();

        let thumb = image
            .thumbnail(Dimensions::new(100, 100), Mode::Inset)
            .unwrap();
        assert_eq!(thumb.size(), Dimensions::new(100, 50));

        let bytes = thumb.get("png", Quality::new(70)).unwrap();
        assert_eq!(bytes, b"png:100x50");
    }

    #[test]
    fn mock_failing_decode() {
        let backend = MockBackend::failing();
        assert!(matches!(backend.load(b"x"), Err(BackendError::Decode(_))));
    }
}
