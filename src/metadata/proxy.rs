use super::{Metadata, MetadataBuilder, MetadataError};
use crate::filesystem::Filesystem;
use crate::media::Media;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Picks the Amazon builder for media whose provider stores on S3, the
/// noop builder otherwise.
#[derive(Default)]
pub struct ProxyMetadataBuilder {
    filesystems: BTreeMap<String, Arc<Filesystem>>,
    amazon: Option<Arc<dyn MetadataBuilder>>,
    noop: Option<Arc<dyn MetadataBuilder>>,
}

impl ProxyMetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_amazon(mut self, builder: Arc<dyn MetadataBuilder>) -> Self {
        self.amazon = Some(builder);
        self
    }

    pub fn with_noop(mut self, builder: Arc<dyn MetadataBuilder>) -> Self {
        self.noop = Some(builder);
        self
    }

    /// Register the filesystem a provider writes to.
    pub fn register_provider(
        mut self,
        provider: impl Into<String>,
        filesystem: Arc<Filesystem>,
    ) -> Self {
        self.filesystems.insert(provider.into(), filesystem);
        self
    }

    fn is_s3_backed(&self, media: &Media) -> bool {
        self.filesystems
            .get(&media.provider_name)
            .is_some_and(|fs| fs.is_s3_backed())
    }
}

impl MetadataBuilder for ProxyMetadataBuilder {
    fn get(&self, media: &Media, filename: &str) -> Result<Metadata, MetadataError> {
        if self.is_s3_backed(media)
            && let Some(amazon) = &self.amazon
        {
            return amazon.get(media, filename);
        }
        match &self.noop {
            Some(noop) => noop.get(media, filename),
            None => Ok(Metadata::new()),
        }
    }
}
