//! S3 object metadata.
//!
//! | Setting | Values | Output key |
//! |---|---|---|
//! | `acl` | `private`, `public`, `open`, `auth_read`, `owner_read`, `owner_full_control` | `ACL` |
//! | `storage` | `standard`, `reduced` | `storage` |
//! | `meta` | free-form map | `meta` |
//! | `cache_control` | header value | `CacheControl` |
//! | `encryption` | `aes256` | `encryption` |
//! | (filename) | extension | `contentType` |

use super::{Metadata, MetadataBuilder, MetadataError};
use crate::media::Media;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const ACLS: &[(&str, &str)] = &[
    ("private", "private"),
    ("public", "public-read"),
    ("open", "public-read-write"),
    ("auth_read", "authenticated-read"),
    ("owner_read", "bucket-owner-read"),
    ("owner_full_control", "bucket-owner-full-control"),
];

const STORAGE_CLASSES: &[(&str, &str)] = &[
    ("standard", "STANDARD"),
    ("reduced", "REDUCED_REDUNDANCY"),
];

/// Extension → content type for everything a media library commonly stores.
const MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("ico", "image/vnd.microsoft.icon"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("ppt", "application/vnd.ms-powerpoint"),
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
];

/// Content type of `filename`, looked up by its lowercased extension.
pub fn mime_type_for(filename: &str) -> Option<&'static str> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AmazonSettings {
    pub acl: String,
    pub storage: String,
    pub meta: BTreeMap<String, String>,
    pub cache_control: Option<String>,
    pub encryption: Option<String>,
}

impl Default for AmazonSettings {
    fn default() -> Self {
        Self {
            acl: "public".to_string(),
            storage: "standard".to_string(),
            meta: BTreeMap::new(),
            cache_control: None,
            encryption: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AmazonMetadataBuilder {
    settings: AmazonSettings,
    acl: &'static str,
    storage: &'static str,
}

impl AmazonMetadataBuilder {
    pub fn new(settings: AmazonSettings) -> Result<Self, MetadataError> {
        let acl = lookup(ACLS, &settings.acl)
            .ok_or_else(|| MetadataError::UnknownAcl(settings.acl.clone()))?;
        let storage = lookup(STORAGE_CLASSES, &settings.storage)
            .ok_or_else(|| MetadataError::UnknownStorage(settings.storage.clone()))?;
        Ok(Self {
            settings,
            acl,
            storage,
        })
    }
}

fn lookup(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
    table.iter().find(|(key, _)| *key == name).map(|(_, v)| *v)
}

impl MetadataBuilder for AmazonMetadataBuilder {
    fn get(&self, _media: &Media, filename: &str) -> Result<Metadata, MetadataError> {
        let mut output = Metadata::new();

        if !self.settings.meta.is_empty() {
            let meta = self
                .settings
                .meta
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            output.insert("meta".into(), Value::Object(meta));
        }
        if let Some(cache_control) = &self.settings.cache_control
            && !cache_control.is_empty()
        {
            output.insert("CacheControl".into(), cache_control.as_str().into());
        }
        if self.settings.encryption.as_deref() == Some("aes256") {
            output.insert("encryption".into(), "AES256".into());
        }

        output.insert("storage".into(), self.storage.into());
        output.insert("ACL".into(), self.acl.into());

        let content_type = mime_type_for(filename)
            .ok_or_else(|| MetadataError::UnknownMimeType(filename.to_string()))?;
        output.insert("contentType".into(), content_type.into());

        Ok(output)
    }
}
