//! Resizing strategies.
//!
//! A resizer reads the original from one [`File`], writes the derived
//! artifact to another, and can predict the output box without touching
//! pixels ([`Resizer::get_box`]).
//!
//! | Name | Strategy | Requires |
//! |---|---|---|
//! | `simple` | scale into the box (inset) or over it (outbound) | width or height |
//! | `square` | center-square when a height is given, then shrink | width |
//! | `crop` | cover the box, then center-crop | width and height |
//!
//! Formats pick a strategy by name through [`ResizerRegistry`].

mod crop;
mod simple;
mod square;

pub use crop::CropResizer;
pub use simple::SimpleResizer;
pub use square::SquareResizer;

use crate::filesystem::{File, FilesystemError};
use crate::format::{FormatSettings, InvalidFormat};
use crate::imaging::{BackendError, Dimensions, ImageBackend, ImageHandle, Mode, Quality};
use crate::media::Media;
use crate::metadata::{MetadataBuilder, MetadataError};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error(transparent)]
    InvalidFormat(#[from] InvalidFormat),
    #[error("Media \"{0}\" has no dimensions")]
    MissingBox(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

pub trait Resizer: Send + Sync {
    /// Write `format`-encoded output for `settings` into `output`.
    fn resize(
        &self,
        media: &Media,
        input: &File,
        output: &File,
        format: &str,
        settings: &FormatSettings,
    ) -> Result<(), ResizeError>;

    /// The box [`resize`](Self::resize) would produce.
    fn get_box(&self, media: &Media, settings: &FormatSettings) -> Result<Dimensions, ResizeError>;
}

/// The media box, which every resize needs.
fn media_box(media: &Media) -> Result<Dimensions, ResizeError> {
    media
        .dimensions
        .filter(|d| !d.is_empty())
        .ok_or_else(|| {
            ResizeError::MissingBox(media.id.as_ref().map(|id| id.to_string()).unwrap_or_default())
        })
}

fn missing_setting(media: &Media, setting: &str) -> ResizeError {
    ResizeError::InvalidFormat(InvalidFormat::new(format!(
        "{setting} parameter is missing in context \"{}\" for provider \"{}\"",
        media.context.as_deref().unwrap_or_default(),
        media.provider_name
    )))
}

/// Shared plumbing: decode the input, encode the result, write it with metadata.
#[derive(Clone)]
struct Pipeline {
    backend: Arc<dyn ImageBackend>,
    metadata: Arc<dyn MetadataBuilder>,
}

impl Pipeline {
    fn load(&self, input: &File) -> Result<Box<dyn ImageHandle>, ResizeError> {
        Ok(self.backend.load(&input.content()?)?)
    }

    fn write(
        &self,
        media: &Media,
        image: &dyn ImageHandle,
        output: &File,
        format: &str,
        settings: &FormatSettings,
    ) -> Result<(), ResizeError> {
        let content = image.get(format, Quality::new(settings.quality))?;
        let metadata = self.metadata.get(media, output.name())?;
        output.set_content(&content, &metadata)?;
        Ok(())
    }
}

/// Resizers by name.
#[derive(Clone, Default)]
pub struct ResizerRegistry {
    resizers: BTreeMap<String, Arc<dyn Resizer>>,
}

impl ResizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `simple`, `square` and `crop` sharing one backend and metadata builder.
    pub fn standard(
        backend: Arc<dyn ImageBackend>,
        metadata: Arc<dyn MetadataBuilder>,
        simple_mode: Mode,
        square_mode: Mode,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(
            "simple",
            Arc::new(SimpleResizer::new(backend.clone(), metadata.clone(), simple_mode)),
        );
        registry.register(
            "square",
            Arc::new(SquareResizer::new(backend.clone(), metadata.clone(), square_mode)),
        );
        registry.register("crop", Arc::new(CropResizer::new(backend, metadata)));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, resizer: Arc<dyn Resizer>) {
        self.resizers.insert(name.into(), resizer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Resizer>> {
        self.resizers.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resizers.keys().map(String::as_str)
    }
}
