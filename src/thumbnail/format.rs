use super::{Thumbnail, ThumbnailError};
use crate::format::{ADMIN, DEFAULT_ENCODING, FormatSettings, REFERENCE, applies_to_context};
use crate::generator::GeneratorError;
use crate::imaging::OutputFormat;
use crate::media::Media;
use crate::provider::MediaProvider;
use crate::resizer::{Resizer, ResizerRegistry};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Generates every applicable format as soon as the reference is stored.
///
/// Formats are resized in parallel on the rayon pool. A format may name its
/// own resizer, looked up in the registry this orchestrator was built with.
pub struct FormatThumbnail {
    default_format: String,
    resizers: ResizerRegistry,
}

impl FormatThumbnail {
    pub fn new(default_format: impl Into<String>) -> Self {
        Self {
            default_format: default_format.into(),
            resizers: ResizerRegistry::new(),
        }
    }

    pub fn with_resizers(mut self, resizers: ResizerRegistry) -> Self {
        self.resizers = resizers;
        self
    }

    /// Output extension: the media's own when it has at least three
    /// characters and can be encoded, else the format encoding, else the
    /// default.
    fn extension(&self, media: &Media, settings: Option<&FormatSettings>) -> String {
        media
            .extension()
            .filter(|ext| ext.len() >= 3 && OutputFormat::from_extension(ext).is_some())
            .or_else(|| {
                settings
                    .map(|s| s.format.clone())
                    .filter(|f| !f.is_empty())
            })
            .unwrap_or_else(|| self.default_format.clone())
    }

    fn resizer_for(
        &self,
        provider: &dyn MediaProvider,
        format: &str,
        settings: &FormatSettings,
    ) -> Result<Option<Arc<dyn Resizer>>, ThumbnailError> {
        match settings.resizer.as_deref().filter(|r| !r.is_empty()) {
            Some(name) => self
                .resizers
                .get(name)
                .map(Some)
                .ok_or_else(|| ThumbnailError::UnknownResizer {
                    format: format.to_string(),
                    resizer: name.to_string(),
                }),
            None => Ok(provider.resizer().cloned()),
        }
    }
}

impl Default for FormatThumbnail {
    fn default() -> Self {
        Self::new(DEFAULT_ENCODING)
    }
}

impl Thumbnail for FormatThumbnail {
    fn generate_public_url(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        format: &str,
    ) -> Result<String, ThumbnailError> {
        self.generate_private_url(provider, media, format)
    }

    fn generate_private_url(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        format: &str,
    ) -> Result<String, ThumbnailError> {
        if format == REFERENCE {
            return Ok(provider.reference_image(media)?);
        }
        let id = media.id.as_ref().ok_or(GeneratorError::MissingId)?;
        Ok(format!(
            "{}/thumb_{}_{}.{}",
            provider.generate_path(media)?,
            id.url_safe(),
            format,
            self.extension(media, provider.format(format))
        ))
    }

    fn generate(&self, provider: &dyn MediaProvider, media: &Media) -> Result<(), ThumbnailError> {
        if !provider.require_thumbnails() {
            return Ok(());
        }
        let reference = provider.filesystem().get(&provider.reference_image(media)?, true)?;
        if !reference.exists()? {
            debug!(key = reference.key(), "Reference missing, skipping thumbnails");
            return Ok(());
        }

        let context = media.context.as_deref().unwrap_or_default();
        let selected: Vec<(&str, &FormatSettings)> = provider
            .formats()
            .iter()
            .filter(|(name, _)| *name == ADMIN || applies_to_context(name, context))
            .collect();

        selected.par_iter().try_for_each(|&(format, settings)| {
            let Some(resizer) = self.resizer_for(provider, format, settings)? else {
                return Ok(());
            };
            let key = self.generate_private_url(provider, media, format)?;
            let output = provider.filesystem().get(&key, true)?;
            let extension = self.extension(media, Some(settings));
            resizer.resize(media, &reference, &output, &extension, settings)?;
            debug!(key = %key, format, "Thumbnail written");
            Ok::<(), ThumbnailError>(())
        })?;

        info!(
            media = %media.id.as_ref().map(|id| id.as_str()).unwrap_or_default(),
            provider = provider.name(),
            count = selected.len(),
            "Thumbnails generated"
        );
        Ok(())
    }

    fn delete(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        formats: Option<&[String]>,
    ) -> Result<(), ThumbnailError> {
        let names: Vec<String> = match formats {
            Some(formats) => formats.to_vec(),
            None => provider.formats().names().map(str::to_string).collect(),
        };
        let filesystem = provider.filesystem();
        for format in names {
            let key = self.generate_private_url(provider, media, &format)?;
            if filesystem.has(&key)? {
                filesystem.delete(&key)?;
                debug!(key = %key, "Thumbnail deleted");
            }
        }
        Ok(())
    }
}
