//! Thumbnail orchestration.
//!
//! A [`Thumbnail`] decides where a media's derived formats live and when they
//! are produced:
//!
//! - [`FormatThumbnail`] resizes every applicable format synchronously.
//! - [`MessengerThumbnail`] queues generation on a [`MessageBus`] and lets a
//!   worker ([`run_worker`]) run the synchronous orchestrator later.
//! - [`CacheResolverThumbnail`] leaves generation to an external on-demand
//!   image cache and only builds its URLs.

mod cache;
mod format;
mod messenger;

pub use cache::{CacheResolver, CacheResolverThumbnail, WebPathResolver};
pub use format::FormatThumbnail;
pub use messenger::{
    ChannelBus, GenerateThumbnailsHandler, GenerateThumbnailsMessage, MessageBus,
    MessengerThumbnail, WorkerStats, run_worker,
};

use crate::filesystem::FilesystemError;
use crate::generator::GeneratorError;
use crate::media::{Media, MediaId};
use crate::provider::MediaProvider;
use crate::resizer::ResizeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
    #[error(transparent)]
    Resize(#[from] ResizeError),
    #[error("Unknown resizer \"{resizer}\" for format \"{format}\"")]
    UnknownResizer { format: String, resizer: String },
    #[error("Media \"{0}\" not found")]
    MediaNotFound(MediaId),
    #[error("Provider \"{0}\" not found")]
    ProviderNotFound(String),
    #[error("No private url for format \"{0}\"")]
    NoPrivateUrl(String),
    #[error("Unable to dispatch thumbnail generation: {0}")]
    Dispatch(String),
}

impl ThumbnailError {
    /// Retrying a queued message cannot succeed.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::MediaNotFound(_) | Self::ProviderNotFound(_))
    }
}

pub trait Thumbnail: Send + Sync {
    fn generate_public_url(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        format: &str,
    ) -> Result<String, ThumbnailError>;

    /// Filesystem key of `format` for `media`.
    fn generate_private_url(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        format: &str,
    ) -> Result<String, ThumbnailError>;

    fn generate(&self, provider: &dyn MediaProvider, media: &Media) -> Result<(), ThumbnailError>;

    /// Remove generated formats: all catalog formats when `formats` is `None`.
    fn delete(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        formats: Option<&[String]>,
    ) -> Result<(), ThumbnailError>;
}
