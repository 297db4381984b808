use super::{Thumbnail, ThumbnailError};
use crate::format::REFERENCE;
use crate::media::Media;
use crate::provider::MediaProvider;

/// Maps an original's path and a filter name to the URL an on-demand image
/// cache serves it from.
pub trait CacheResolver: Send + Sync {
    fn browser_path(&self, path: &str, filter: &str) -> String;
}

/// `<prefix>/<filter>/<path>`.
#[derive(Debug, Clone)]
pub struct WebPathResolver {
    prefix: String,
}

impl WebPathResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl CacheResolver for WebPathResolver {
    fn browser_path(&self, path: &str, filter: &str) -> String {
        format!(
            "{}/{}/{}",
            self.prefix.trim_end_matches('/'),
            filter.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Thumbnails produced by an external cache on first request.
pub struct CacheResolverThumbnail<R> {
    resolver: R,
}

impl<R: CacheResolver> CacheResolverThumbnail<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

impl<R: CacheResolver> Thumbnail for CacheResolverThumbnail<R> {
    fn generate_public_url(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        format: &str,
    ) -> Result<String, ThumbnailError> {
        let reference = provider.reference_image(media)?;
        if format == REFERENCE {
            return Ok(reference);
        }
        Ok(self.resolver.browser_path(&reference, format))
    }

    fn generate_private_url(
        &self,
        provider: &dyn MediaProvider,
        media: &Media,
        format: &str,
    ) -> Result<String, ThumbnailError> {
        if format != REFERENCE {
            return Err(ThumbnailError::NoPrivateUrl(format.to_string()));
        }
        Ok(provider.reference_image(media)?)
    }

    fn generate(
        &self,
        _provider: &dyn MediaProvider,
        _media: &Media,
    ) -> Result<(), ThumbnailError> {
        Ok(())
    }

    fn delete(
        &self,
        _provider: &dyn MediaProvider,
        _media: &Media,
        _formats: Option<&[String]>,
    ) -> Result<(), ThumbnailError> {
        Ok(())
    }
}
