//! The media entity consumed by the pipeline.
//!
//! Persistence belongs to the host application; the pipeline reads and
//! updates these fields and looks media up through [`MediaManager`].

use crate::cdn::FlushStatus;
use crate::imaging::Dimensions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::SystemTime;

/// Opaque media identifier: numeric, UUID or a hierarchical path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as an unsigned integer, if it is one.
    pub fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    /// Last non-empty `/` segment; identity for numeric and UUID ids.
    pub fn url_safe(&self) -> &str {
        self.0
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(self.0.as_str())
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for MediaId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MediaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for MediaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Processing state owned by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderStatus {
    #[default]
    Pending,
    Ok,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct Media {
    pub id: Option<MediaId>,
    /// Original filename of the upload.
    pub name: Option<String>,
    pub context: Option<String>,
    pub provider_name: String,
    /// Upload payload; cleared once the provider has stored it.
    pub binary_content: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub dimensions: Option<Dimensions>,
    pub provider_status: ProviderStatus,
    /// Stored filename of the original, relative to the generated path.
    pub provider_reference: Option<String>,
    /// True until the CDN reports the last flush as complete.
    pub cdn_is_flushable: bool,
    pub cdn_flush_identifier: Option<String>,
    pub cdn_status: Option<FlushStatus>,
    pub cdn_flush_at: Option<SystemTime>,
}

impl Media {
    pub fn new(
        id: impl Into<MediaId>,
        context: impl Into<String>,
        provider_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            context: Some(context.into()),
            provider_name: provider_name.into(),
            ..Self::default()
        }
    }

    /// Attach an upload.
    pub fn with_upload(mut self, name: impl Into<String>, content: Vec<u8>) -> Self {
        self.name = Some(name.into());
        self.binary_content = Some(content);
        self
    }

    /// Lowercased extension of the stored reference, falling back to the upload name.
    pub fn extension(&self) -> Option<String> {
        self.provider_reference
            .as_deref()
            .or(self.name.as_deref())
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && !ext.contains('/'))
    }
}

/// Media lookup supplied by the host application.
pub trait MediaManager: Send + Sync {
    fn find(&self, id: &MediaId) -> Option<Media>;
}

/// In-process media store, used by the CLI and by tests.
#[derive(Default)]
pub struct InMemoryMediaManager {
    media: Mutex<HashMap<MediaId, Media>>,
}

impl InMemoryMediaManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a copy of `media`. Media without an id are ignored.
    pub fn save(&self, media: &Media) {
        if let Some(id) = &media.id
            && let Ok(mut store) = self.media.lock()
        {
            store.insert(id.clone(), media.clone());
        }
    }

    pub fn remove(&self, id: &MediaId) -> Option<Media> {
        self.media.lock().ok()?.remove(id)
    }
}

impl MediaManager for InMemoryMediaManager {
    fn find(&self, id: &MediaId) -> Option<Media> {
        self.media.lock().ok()?.get(id).cloned()
    }
}
