use super::{Metadata, MetadataBuilder, MetadataError};
use crate::media::Media;

/// Attaches nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetadataBuilder;

impl MetadataBuilder for NoopMetadataBuilder {
    fn get(&self, _media: &Media, _filename: &str) -> Result<Metadata, MetadataError> {
        Ok(Metadata::new())
    }
}
