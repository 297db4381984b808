use super::{Thumbnail, ThumbnailError};
use crate::generator::GeneratorError;
use crate::media::{Media, MediaId, MediaManager};
use crate::pool::Pool;
use crate::provider::MediaProvider;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

/// Request to (re)generate every thumbnail of a media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateThumbnailsMessage {
    pub media_id: MediaId,
}

pub trait MessageBus: Send + Sync {
    fn dispatch(&self, message: GenerateThumbnailsMessage) -> Result<(), ThumbnailError>;
}

/// In-process bus over a std channel.
pub struct ChannelBus {
    sender: Sender<GenerateThumbnailsMessage>,
}

impl ChannelBus {
    /// The bus and the receiving end to hand to [`run_worker`].
    pub fn new() -> (Self, Receiver<GenerateThumbnailsMessage>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl MessageBus for ChannelBus {
    fn dispatch(&self, message: GenerateThumbnailsMessage) -> Result<(), ThumbnailError> {
        self.sender
            .send(message)
            .map_err(|e| ThumbnailError::Dispatch(format!("worker is gone, dropped {:?}", e.0)))
    }
}

/// Defers generation to a queue; URLs and deletion go straight to `inner`.
pub struct MessengerThumbnail {
    inner: Arc<dyn Thumbnail>,
    bus: Arc<dyn MessageBus>,
}

impl MessengerThumbnail {
    pub fn new(inner: Arc<dyn Thumbnail>, bus: Arc<dyn MessageBus>) -> Self {
        Self { inner, bus }
    }
}

impl Thumbnail for MessengerThumbnail {
    fn generate_public_url(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        format: &str,
    ) -> Result<String, ThumbnailError> {
        self.inner.generate_public_url(provider, media, format)
    }

    fn generate_private_url(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        format: &str,
    ) -> Result<String, ThumbnailError> {
        self.inner.generate_private_url(provider, media, format)
    }

    fn generate(&self, _provider: &dyn MediaProvider, media: &Media) -> Result<(), ThumbnailError> {
        let media_id = media.id.clone().ok_or(GeneratorError::MissingId)?;
        debug!(media = %media_id, "Queueing thumbnail generation");
        self.bus.dispatch(GenerateThumbnailsMessage { media_id })
    }

    fn delete(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        formats: Option<&[String]>,
    ) -> Result<(), ThumbnailError> {
        self.inner.delete(provider, media, formats)
    }
}

/// Consumes [`GenerateThumbnailsMessage`]s with a synchronous orchestrator.
pub struct GenerateThumbnailsHandler {
    thumbnail: Arc<dyn Thumbnail>,
    media: Arc<dyn MediaManager>,
    pool: Arc<Pool>,
}

impl GenerateThumbnailsHandler {
    pub fn new(
        thumbnail: Arc<dyn Thumbnail>,
        media: Arc<dyn MediaManager>,
        pool: Arc<Pool>,
    ) -> Self {
        Self {
            thumbnail,
            media,
            pool,
        }
    }

    pub fn handle(&self, message: &GenerateThumbnailsMessage) -> Result<(), ThumbnailError> {
        let media = self
            .media
            .find(&message.media_id)
            .ok_or_else(|| ThumbnailError::MediaNotFound(message.media_id.clone()))?;
        let provider = self
            .pool
            .get_provider(&media.provider_name)
            .map_err(|_| ThumbnailError::ProviderNotFound(media.provider_name.clone()))?;

        self.thumbnail.generate(provider.as_ref(), &media)
    }
}

/// Outcome of a drained queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub handled: usize,
    pub failed: usize,
}

/// Handle messages until every sender is dropped. Failures are logged and
/// never requeued.
pub fn run_worker(
    receiver: Receiver<GenerateThumbnailsMessage>,
    handler: &GenerateThumbnailsHandler,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    for message in receiver {
        match handler.handle(&message) {
            Ok(()) => stats.handled += 1,
            Err(e) => {
                warn!(
                    media = %message.media_id,
                    unrecoverable = e.is_unrecoverable(),
                    error = %e,
                    "Thumbnail generation failed"
                );
                stats.failed += 1;
            }
        }
    }
    info!(handled = stats.handled, failed = stats.failed, "Thumbnail worker stopped");
    stats
}
