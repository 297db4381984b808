//! Storage metadata attached to written artifacts.
//!
//! A [`MetadataBuilder`] turns a media and a target filename into the
//! key/value map pushed to the storage backend alongside the bytes. Only
//! backends that answer [`supports_metadata`](crate::filesystem::Adapter::supports_metadata)
//! receive it.

mod amazon;
mod noop;
mod proxy;

pub use amazon::{AmazonMetadataBuilder, AmazonSettings, mime_type_for};
pub use noop::NoopMetadataBuilder;
pub use proxy::ProxyMetadataBuilder;

use crate::media::Media;
use std::collections::BTreeMap;
use thiserror::Error;

/// Backend metadata: header-like keys to JSON values.
pub type Metadata = BTreeMap<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("The content type for the filename \"{0}\" could not be guessed")]
    UnknownMimeType(String),
    #[error("Unknown ACL \"{0}\"")]
    UnknownAcl(String),
    #[error("Unknown storage class \"{0}\"")]
    UnknownStorage(String),
}

pub trait MetadataBuilder: Send + Sync {
    fn get(&self, media: &Media, filename: &str) -> Result<Metadata, MetadataError>;
}
