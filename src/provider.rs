//! Media providers.
//!
//! A provider owns everything needed to store one kind of media: the
//! filesystem, the CDN, the path generator, the thumbnail orchestrator, an
//! optional resizer and the format catalog. [`ImageProvider`] drives a media
//! through its lifecycle:
//!
//! ```text
//! transform ──▶ post_persist ──▶ (post_update)* ──▶ remove
//!   box, ref      write ref,        replace ref,       delete ref
//!   Pending       thumbnails, Ok    thumbnails, flush  + thumbnails
//! ```

use crate::cdn::{Cdn, CdnError, FlushStatus};
use crate::filesystem::{File, Filesystem, FilesystemError};
use crate::format::{
    ADMIN, FormatCatalog, FormatSettings, InvalidFormat, REFERENCE, applies_to_context,
};
use crate::generator::{Generator, GeneratorError};
use crate::imaging::{BackendError, ImageBackend};
use crate::media::{Media, ProviderStatus};
use crate::metadata::mime_type_for;
use crate::resizer::Resizer;
use crate::thumbnail::{Thumbnail, ThumbnailError};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Extensions an image provider accepts unless configured otherwise.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff"];

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Media has no binary content")]
    MissingContent,
    #[error("Extension \"{extension}\" is not allowed by provider \"{provider}\"")]
    ExtensionNotAllowed { extension: String, provider: String },
    #[error(transparent)]
    InvalidFormat(#[from] InvalidFormat),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
    #[error(transparent)]
    Cdn(#[from] CdnError),
}

pub trait MediaProvider: Send + Sync {
    fn name(&self) -> &str;

    fn formats(&self) -> &FormatCatalog;

    fn format(&self, name: &str) -> Option<&FormatSettings> {
        self.formats().get(name)
    }

    fn filesystem(&self) -> &Arc<Filesystem>;

    fn cdn(&self) -> &Arc<dyn Cdn>;

    fn resizer(&self) -> Option<&Arc<dyn Resizer>>;

    /// Providers without a resizer store originals only.
    fn require_thumbnails(&self) -> bool {
        self.resizer().is_some()
    }

    fn generate_path(&self, media: &Media) -> Result<String, GeneratorError>;

    /// Key of the stored original.
    fn reference_image(&self, media: &Media) -> Result<String, GeneratorError> {
        let reference = media
            .provider_reference
            .as_deref()
            .ok_or(GeneratorError::MissingReference)?;
        Ok(format!("{}/{}", self.generate_path(media)?, reference))
    }

    fn reference_file(&self, media: &Media) -> Result<File, ProviderError> {
        let key = self.reference_image(media)?;
        Ok(self.filesystem().get(&key, true)?)
    }

    fn generate_public_url(&self, media: &Media, format: &str) -> Result<String, ProviderError>;

    fn generate_private_url(&self, media: &Media, format: &str) -> Result<String, ProviderError>;

    /// Inspect the upload before the media is persisted.
    fn transform(&self, media: &mut Media) -> Result<(), ProviderError>;

    fn post_persist(&self, media: &mut Media) -> Result<(), ProviderError>;

    fn post_update(&self, media: &mut Media) -> Result<(), ProviderError>;

    fn remove(&self, media: &Media) -> Result<(), ProviderError>;

    fn update_cdn_status(&self, media: &mut Media) -> Result<(), ProviderError>;
}

/// Provider for raster images.
pub struct ImageProvider {
    name: String,
    filesystem: Arc<Filesystem>,
    cdn: Arc<dyn Cdn>,
    generator: Arc<dyn Generator>,
    thumbnail: Arc<dyn Thumbnail>,
    backend: Arc<dyn ImageBackend>,
    resizer: Option<Arc<dyn Resizer>>,
    formats: FormatCatalog,
    allowed_extensions: Vec<String>,
}

impl ImageProvider {
    pub fn new(
        name: impl Into<String>,
        filesystem: Arc<Filesystem>,
        cdn: Arc<dyn Cdn>,
        generator: Arc<dyn Generator>,
        thumbnail: Arc<dyn Thumbnail>,
        backend: Arc<dyn ImageBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            filesystem,
            cdn,
            generator,
            thumbnail,
            backend,
            resizer: None,
            formats: FormatCatalog::new(),
            allowed_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_resizer(mut self, resizer: Arc<dyn Resizer>) -> Self {
        self.resizer = Some(resizer);
        self
    }

    /// Replace the accepted extensions. Matching ignores case.
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn add_format(
        &mut self,
        name: impl Into<String>,
        settings: FormatSettings,
    ) -> Result<(), ProviderError> {
        self.formats.insert(name, settings)?;
        Ok(())
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Catalog entries generated for `media`: its context's formats plus admin.
    fn context_formats(&self, media: &Media) -> Vec<String> {
        let context = media.context.as_deref().unwrap_or_default();
        self.formats
            .names()
            .filter(|name| *name == ADMIN || applies_to_context(name, context))
            .map(str::to_string)
            .collect()
    }

    fn context_urls(&self, media: &Media) -> Result<Vec<String>, ProviderError> {
        self.context_formats(media)
            .iter()
            .map(|format| self.generate_private_url(media, format))
            .collect()
    }

    fn write_reference(&self, media: &Media) -> Result<(), ProviderError> {
        let content = media
            .binary_content
            .as_deref()
            .ok_or(ProviderError::MissingContent)?;
        let key = self.reference_image(media)?;
        self.filesystem.write(&key, content, true)?;
        debug!(key = %key, bytes = content.len(), "Reference written");
        Ok(())
    }

    fn store(&self, media: &mut Media) -> Result<(), ProviderError> {
        self.write_reference(media)?;
        self.thumbnail.generate(self, media)?;
        media.binary_content = None;
        Ok(())
    }

    /// Swap the stored files of `previous` for the new upload on `media`.
    fn replace(&self, media: &mut Media, previous: &Media) -> Result<(), ProviderError> {
        if self.require_thumbnails() {
            self.thumbnail.delete(self, previous, None)?;
        }
        self.transform(media)?;
        if previous.provider_reference.is_some()
            && previous.provider_reference != media.provider_reference
        {
            let old = self.reference_image(previous)?;
            if self.filesystem.has(&old)? {
                self.filesystem.delete(&old)?;
            }
        }
        self.store(media)?;
        self.flush_cdn(media)
    }

    fn flush_cdn(&self, media: &mut Media) -> Result<(), ProviderError> {
        if media.id.is_none() || !self.require_thumbnails() || media.cdn_is_flushable {
            return Ok(());
        }
        let paths = self.context_urls(media)?;
        if paths.is_empty() {
            return Ok(());
        }
        media.cdn_flush_identifier = self.cdn.flush_paths(&paths)?;
        media.cdn_is_flushable = true;
        media.cdn_status = Some(FlushStatus::ToFlush);
        info!(
            media = %media_label(media),
            count = paths.len(),
            identifier = media.cdn_flush_identifier.as_deref().unwrap_or_default(),
            "CDN flush requested"
        );
        Ok(())
    }

    /// Record the outcome of a lifecycle step on the media status.
    fn track(media: &mut Media, result: Result<(), ProviderError>) -> Result<(), ProviderError> {
        match result {
            Ok(()) => {
                media.provider_status = ProviderStatus::Ok;
                Ok(())
            }
            Err(e) => {
                media.provider_status = ProviderStatus::Error;
                warn!(media = %media_label(media), error = %e, "Media processing failed");
                Err(e)
            }
        }
    }
}

fn media_label(media: &Media) -> &str {
    media.id.as_ref().map(|id| id.as_str()).unwrap_or_default()
}

/// Stored filename: the first 40 hex chars of the content digest.
fn reference_name(content: &[u8], extension: &str) -> String {
    let digest = Sha256::digest(content);
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{}.{}", &hex[..40], extension)
}

impl MediaProvider for ImageProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn formats(&self) -> &FormatCatalog {
        &self.formats
    }

    fn filesystem(&self) -> &Arc<Filesystem> {
        &self.filesystem
    }

    fn cdn(&self) -> &Arc<dyn Cdn> {
        &self.cdn
    }

    fn resizer(&self) -> Option<&Arc<dyn Resizer>> {
        self.resizer.as_ref()
    }

    fn generate_path(&self, media: &Media) -> Result<String, GeneratorError> {
        self.generator.generate_path(media)
    }

    fn generate_public_url(&self, media: &Media, format: &str) -> Result<String, ProviderError> {
        let path = if format == REFERENCE {
            self.reference_image(media)?
        } else {
            self.thumbnail.generate_public_url(self, media, format)?
        };
        if path.contains("://") {
            return Ok(path);
        }
        Ok(self.cdn.get_path(&path, media.cdn_is_flushable))
    }

    fn generate_private_url(&self, media: &Media, format: &str) -> Result<String, ProviderError> {
        Ok(self.thumbnail.generate_private_url(self, media, format)?)
    }

    fn transform(&self, media: &mut Media) -> Result<(), ProviderError> {
        let content = media
            .binary_content
            .as_deref()
            .ok_or(ProviderError::MissingContent)?;

        let extension = media
            .name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.allowed_extensions.contains(&extension) {
            return Err(ProviderError::ExtensionNotAllowed {
                extension,
                provider: self.name.clone(),
            });
        }

        let dimensions = match self.backend.identify(content) {
            Ok(dimensions) => dimensions,
            Err(e) => {
                media.provider_status = ProviderStatus::Error;
                warn!(
                    name = media.name.as_deref().unwrap_or_default(),
                    error = %e,
                    "Upload could not be decoded"
                );
                return Err(e.into());
            }
        };

        let size = content.len() as u64;
        let reference = reference_name(content, &extension);
        media.content_type = mime_type_for(&reference).map(str::to_string);
        media.size = Some(size);
        media.dimensions = Some(dimensions);
        media.provider_reference = Some(reference);
        media.provider_status = ProviderStatus::Pending;
        debug!(
            name = media.name.as_deref().unwrap_or_default(),
            dimensions = %dimensions,
            bytes = size,
            "Upload identified"
        );
        Ok(())
    }

    fn post_persist(&self, media: &mut Media) -> Result<(), ProviderError> {
        let result = self.store(media);
        Self::track(media, result)
    }

    fn post_update(&self, media: &mut Media) -> Result<(), ProviderError> {
        if media.binary_content.is_none() {
            return Ok(());
        }
        let previous = media.clone();
        let result = self.replace(media, &previous);
        Self::track(media, result)
    }

    fn remove(&self, media: &Media) -> Result<(), ProviderError> {
        let mut paths = Vec::new();
        if self.require_thumbnails() {
            paths = self.context_urls(media)?;
            self.thumbnail.delete(self, media, None)?;
        }

        let reference = self.reference_image(media)?;
        if self.filesystem.has(&reference)? {
            self.filesystem.delete(&reference)?;
        }
        paths.push(reference);

        if media.cdn_is_flushable {
            self.cdn.flush_paths(&paths)?;
        }
        info!(media = %media_label(media), files = paths.len(), "Media removed");
        Ok(())
    }

    fn update_cdn_status(&self, media: &mut Media) -> Result<(), ProviderError> {
        let Some(identifier) = media.cdn_flush_identifier.as_deref() else {
            return Ok(());
        };
        let status = self.cdn.get_flush_status(identifier)?;
        media.cdn_status = Some(status);
        if status == FlushStatus::Ok {
            media.cdn_is_flushable = false;
            media.cdn_flush_at = Some(SystemTime::now());
        }
        debug!(media = %media_label(media), status = %status, "CDN status updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdn::{ClientError, CloudFront, CloudFrontClient, Invalidation, InvalidationRequest};
    use crate::imaging::Dimensions;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{memory_provider, memory_provider_with_cdn, png_bytes, stored_media};
    use std::sync::Mutex;

    fn catalog() -> FormatCatalog {
        let mut catalog = FormatCatalog::new();
        catalog
            .insert("default_small", FormatSettings::with_size(Some(100), None))
            .unwrap();
        catalog
            .insert("news_small", FormatSettings::with_size(Some(50), None))
            .unwrap();
        catalog
            .insert(ADMIN, FormatSettings::with_size(Some(200), None))
            .unwrap();
        catalog
    }

    fn mock() -> Arc<MockBackend> {
        Arc::new(MockBackend::new(Dimensions::new(800, 600)))
    }

    fn upload(id: &str, name: &str, content: &[u8]) -> Media {
        Media::new(id, "default", "image").with_upload(name, content.to_vec())
    }

    // =========================================================================
    // transform / post_persist
    // =========================================================================

    #[test]
    fn transform_sets_box_reference_and_pending() {
        let provider = memory_provider(catalog(), mock(), true);
        let mut media = upload("1", "Photo.JPG", b"bytes");

        provider.transform(&mut media).unwrap();

        assert_eq!(media.dimensions, Some(Dimensions::new(800, 600)));
        assert_eq!(media.size, Some(5));
        assert_eq!(media.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(media.provider_status, ProviderStatus::Pending);
        let reference = media.provider_reference.unwrap();
        assert_eq!(reference.len(), 44);
        assert!(reference.ends_with(".jpg"));
    }

    #[test]
    fn transform_reference_is_content_addressed() {
        let provider = memory_provider(catalog(), mock(), true);
        let mut a = upload("1", "a.png", b"same");
        let mut b = upload("2", "b.png", b"same");
        let mut c = upload("3", "c.png", b"other");
        provider.transform(&mut a).unwrap();
        provider.transform(&mut b).unwrap();
        provider.transform(&mut c).unwrap();
        assert_eq!(a.provider_reference, b.provider_reference);
        assert_ne!(a.provider_reference, c.provider_reference);
    }

    #[test]
    fn transform_without_content_fails() {
        let provider = memory_provider(catalog(), mock(), true);
        let mut media = Media::new("1", "default", "image");
        assert!(matches!(provider.transform(&mut media), Err(ProviderError::MissingContent)));
    }

    #[test]
    fn transform_rejects_disallowed_extension() {
        let provider = memory_provider(catalog(), mock(), true);
        let mut media = upload("1", "notes.txt", b"x");
        let err = provider.transform(&mut media).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ExtensionNotAllowed { extension, .. } if extension == "txt"
        ));
    }

    #[test]
    fn allowed_extensions_can_be_narrowed() {
        let provider = memory_provider(catalog(), mock(), true).with_allowed_extensions(["PNG"]);
        assert_eq!(provider.allowed_extensions(), ["png"]);
        let mut media = upload("1", "a.jpg", b"x");
        assert!(provider.transform(&mut media).is_err());
    }

    #[test]
    fn transform_decode_failure_sets_error() {
        let provider = memory_provider(catalog(), Arc::new(MockBackend::failing()), true);
        let mut media = upload("1", "a.jpg", b"garbage");
        assert!(matches!(provider.transform(&mut media), Err(ProviderError::Backend(_))));
        assert_eq!(media.provider_status, ProviderStatus::Error);
    }

    #[test]
    fn post_persist_stores_reference_and_thumbnails() {
        let provider = memory_provider(catalog(), mock(), true);
        let mut media = upload("1", "a.jpg", b"bytes");
        provider.transform(&mut media).unwrap();
        provider.post_persist(&mut media).unwrap();

        assert_eq!(media.provider_status, ProviderStatus::Ok);
        assert!(media.binary_content.is_none());
        let keys = provider.filesystem().keys().unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"default/0001/01/thumb_1_default_small.jpg".to_string()));
        assert!(keys.contains(&"default/0001/01/thumb_1_admin.jpg".to_string()));
        assert!(keys.contains(&provider.reference_image(&media).unwrap()));
        assert_eq!(provider.reference_file(&media).unwrap().content().unwrap(), b"bytes");
    }

    #[test]
    fn post_persist_without_resizer_stores_reference_only() {
        let provider = memory_provider(catalog(), mock(), false);
        let mut media = upload("1", "a.jpg", b"bytes");
        provider.transform(&mut media).unwrap();
        provider.post_persist(&mut media).unwrap();
        assert_eq!(provider.filesystem().keys().unwrap().len(), 1);
    }

    #[test]
    fn post_persist_failure_sets_error() {
        let provider = memory_provider(catalog(), mock(), true);
        let mut media = upload("abc", "a.jpg", b"bytes");
        provider.transform(&mut media).unwrap();

        let err = provider.post_persist(&mut media).unwrap_err();
        assert!(matches!(err, ProviderError::Generator(GeneratorError::NonNumericId(_))));
        assert_eq!(media.provider_status, ProviderStatus::Error);
    }

    // =========================================================================
    // URLs
    // =========================================================================

    #[test]
    fn public_url_goes_through_cdn() {
        let provider = memory_provider(catalog(), mock(), true);
        let media = stored_media("1", "abc.jpg");
        assert_eq!(
            provider.generate_public_url(&media, "default_small").unwrap(),
            "/uploads/media/default/0001/01/thumb_1_default_small.jpg"
        );
        assert_eq!(
            provider.generate_public_url(&media, REFERENCE).unwrap(),
            "/uploads/media/default/0001/01/abc.jpg"
        );
        assert_eq!(
            provider.generate_private_url(&media, ADMIN).unwrap(),
            "default/0001/01/thumb_1_admin.jpg"
        );
    }

    #[test]
    fn reference_without_provider_reference_fails() {
        let provider = memory_provider(catalog(), mock(), true);
        let media = Media::new("1", "default", "image");
        assert_eq!(provider.reference_image(&media), Err(GeneratorError::MissingReference));
    }

    #[test]
    fn add_format_validates() {
        let mut provider = memory_provider(FormatCatalog::new(), mock(), true);
        assert!(provider.add_format("default_x", FormatSettings::default()).is_err());
        provider
            .add_format("default_x", FormatSettings::with_size(Some(10), None))
            .unwrap();
        assert!(provider.format("default_x").is_some());
    }

    // =========================================================================
    // update / remove / CDN
    // =========================================================================

    struct RecordingCloudFront {
        status: Mutex<&'static str>,
        flushed: Mutex<Vec<Vec<String>>>,
    }

    impl CloudFrontClient for RecordingCloudFront {
        fn create_invalidation(
            &self,
            request: &InvalidationRequest,
        ) -> Result<Invalidation, ClientError> {
            self.flushed.lock().unwrap().push(request.paths.clone());
            Ok(Invalidation {
                id: "INV1".into(),
                status: "InProgress".into(),
            })
        }

        fn get_invalidation(
            &self,
            _distribution_id: &str,
            id: &str,
        ) -> Result<Invalidation, ClientError> {
            Ok(Invalidation {
                id: id.into(),
                status: (*self.status.lock().unwrap()).into(),
            })
        }
    }

    fn cloudfront_provider() -> (Arc<RecordingCloudFront>, ImageProvider) {
        let client = Arc::new(RecordingCloudFront {
            status: Mutex::new("InProgress"),
            flushed: Mutex::new(Vec::new()),
        });
        let provider = memory_provider_with_cdn(
            catalog(),
            mock(),
            true,
            Arc::new(CloudFront::new("https://cdn.example.com", "DIST", client.clone())),
        );
        (client, provider)
    }

    #[test]
    fn post_update_replaces_content_and_flushes() {
        let (client, provider) = cloudfront_provider();
        let mut media = upload("1", "a.jpg", b"first");
        provider.transform(&mut media).unwrap();
        provider.post_persist(&mut media).unwrap();
        let old_reference = provider.reference_image(&media).unwrap();

        media.binary_content = Some(b"second".to_vec());
        provider.post_update(&mut media).unwrap();

        let new_reference = provider.reference_image(&media).unwrap();
        assert_ne!(new_reference, old_reference);
        assert!(!provider.filesystem().has(&old_reference).unwrap());
        assert!(provider.filesystem().has(&new_reference).unwrap());
        assert_eq!(media.cdn_flush_identifier.as_deref(), Some("INV1"));
        assert_eq!(media.cdn_status, Some(FlushStatus::ToFlush));
        assert!(media.cdn_is_flushable);
        assert_eq!(media.provider_status, ProviderStatus::Ok);

        let flushed = client.flushed.lock().unwrap();
        assert_eq!(
            flushed[0],
            vec![
                "/default/0001/01/thumb_1_admin.jpg",
                "/default/0001/01/thumb_1_default_small.jpg",
            ]
        );
    }

    #[test]
    fn post_update_without_content_is_noop() {
        let (client, provider) = cloudfront_provider();
        let mut media = stored_media("1", "abc.jpg");
        provider.post_update(&mut media).unwrap();
        assert!(client.flushed.lock().unwrap().is_empty());
        assert!(media.cdn_flush_identifier.is_none());
    }

    #[test]
    fn update_cdn_status_clears_flushable_when_done() {
        let (client, provider) = cloudfront_provider();
        let mut media = stored_media("1", "abc.jpg");
        media.cdn_flush_identifier = Some("INV1".into());
        media.cdn_is_flushable = true;

        provider.update_cdn_status(&mut media).unwrap();
        assert_eq!(media.cdn_status, Some(FlushStatus::Waiting));
        assert!(media.cdn_is_flushable);

        *client.status.lock().unwrap() = "Completed";
        provider.update_cdn_status(&mut media).unwrap();
        assert_eq!(media.cdn_status, Some(FlushStatus::Ok));
        assert!(!media.cdn_is_flushable);
        assert!(media.cdn_flush_at.is_some());
    }

    #[test]
    fn update_cdn_status_without_identifier_is_noop() {
        let (_client, provider) = cloudfront_provider();
        let mut media = stored_media("1", "abc.jpg");
        provider.update_cdn_status(&mut media).unwrap();
        assert!(media.cdn_status.is_none());
    }

    #[test]
    fn remove_deletes_everything_and_flushes_when_flushable() {
        let (client, provider) = cloudfront_provider();
        let mut media = upload("1", "a.jpg", b"bytes");
        provider.transform(&mut media).unwrap();
        provider.post_persist(&mut media).unwrap();
        media.cdn_is_flushable = true;

        provider.remove(&media).unwrap();
        assert!(provider.filesystem().keys().unwrap().is_empty());
        assert_eq!(client.flushed.lock().unwrap()[0].len(), 3);
    }

    #[test]
    fn remove_without_flushable_does_not_flush() {
        let (client, provider) = cloudfront_provider();
        let mut media = upload("1", "a.jpg", b"bytes");
        provider.transform(&mut media).unwrap();
        provider.post_persist(&mut media).unwrap();

        provider.remove(&media).unwrap();
        assert!(provider.filesystem().keys().unwrap().is_empty());
        assert!(client.flushed.lock().unwrap().is_empty());
    }

    #[test]
    fn reference_name_is_stable() {
        let name = reference_name(&png_bytes(2, 2), "png");
        assert_eq!(name.len(), 44);
        assert_eq!(name, reference_name(&png_bytes(2, 2), "png"));
    }
}
