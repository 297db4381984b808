//! Shared test utilities.
//!
//! Builds in-memory providers wired the way the configuration layer wires
//! real ones, so thumbnail and provider tests exercise the same paths.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let backend = Arc::new(MockBackend::new(Dimensions::new(800, 600)));
//! let provider = memory_provider(catalog, backend, true);
//! let media = stored_media("1", "abc.jpg");
//! store_reference(&provider, &media);
//! ```

use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};

use crate::cdn::{Cdn, Server};
use crate::filesystem::{Filesystem, MemoryAdapter};
use crate::format::FormatCatalog;
use crate::generator::IdGenerator;
use crate::imaging::backend::tests::MockBackend;
use crate::imaging::{Dimensions, Mode};
use crate::media::Media;
use crate::metadata::NoopMetadataBuilder;
use crate::provider::{ImageProvider, MediaProvider};
use crate::resizer::SimpleResizer;
use crate::thumbnail::FormatThumbnail;

// =========================================================================
// Fixtures
// =========================================================================

/// A `width`x`height` gradient encoded as PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// A media that has already been through `transform`: 800x600, in the
/// `default` context of the `image` provider.
pub fn stored_media(id: &str, reference: &str) -> Media {
    let mut media = Media::new(id, "default", "image");
    media.provider_reference = Some(reference.to_string());
    media.dimensions = Some(Dimensions::new(800, 600));
    media
}

// =========================================================================
// Providers
// =========================================================================

/// Image provider on a memory filesystem behind a `/uploads/media` server CDN.
pub fn memory_provider(
    catalog: FormatCatalog,
    backend: Arc<MockBackend>,
    resize: bool,
) -> ImageProvider {
    memory_provider_with_cdn(catalog, backend, resize, Arc::new(Server::new("/uploads/media")))
}

/// As [`memory_provider`] with a caller-supplied CDN.
pub fn memory_provider_with_cdn(
    catalog: FormatCatalog,
    backend: Arc<MockBackend>,
    resize: bool,
    cdn: Arc<dyn Cdn>,
) -> ImageProvider {
    let filesystem = Arc::new(Filesystem::new(Arc::new(MemoryAdapter::new())));
    let mut provider = ImageProvider::new(
        "image",
        filesystem,
        cdn,
        Arc::new(IdGenerator::default()),
        Arc::new(FormatThumbnail::default()),
        backend.clone(),
    );
    if resize {
        provider = provider.with_resizer(Arc::new(SimpleResizer::new(
            backend,
            Arc::new(NoopMetadataBuilder),
            Mode::Inset,
        )));
    }
    for (name, settings) in catalog.iter() {
        provider.add_format(name, settings.clone()).unwrap();
    }
    provider
}

/// Write placeholder bytes where `media`'s original lives.
pub fn store_reference(provider: &ImageProvider, media: &Media) {
    let key = provider.reference_image(media).unwrap();
    provider.filesystem().write(&key, b"original", true).unwrap();
}
