//! Format definitions and catalogs.
//!
//! A format is a named output definition inside a context. Providers carry a flat
//! catalog keyed `"<context>_<format>"` plus the cross-context [`ADMIN`]
//! format; [`REFERENCE`] always names the original upload and can never be
//! declared.
//!
//! ```toml
//! [contexts.news.formats.small]
//! width = 100
//! quality = 70
//!
//! [contexts.news.formats.wide]
//! width = 820
//! height = 300
//! resizer = "crop"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Cross-context format generated for every media.
pub const ADMIN: &str = "admin";

/// Pseudo-format naming the original file.
pub const REFERENCE: &str = "reference";

/// Encoding used when neither the media nor the format names one.
pub const DEFAULT_ENCODING: &str = "jpg";

/// A format configuration bug: missing sides, out-of-range quality, reserved name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid format: {0}")]
pub struct InvalidFormat(pub String);

impl InvalidFormat {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Settings for one format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatSettings {
    /// Target width in pixels.
    pub width: Option<u32>,
    /// Target height in pixels.
    pub height: Option<u32>,
    /// Encoder quality, 0–100.
    pub quality: u8,
    /// Output encoding, used when the media has no usable extension.
    pub format: String,
    /// Whether this format counts toward minimum upload dimensions.
    pub constraint: bool,
    /// Resizer override by registry name (`simple`, `square`, `crop`).
    pub resizer: Option<String>,
    /// Free-form resizer options.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resizer_options: BTreeMap<String, serde_json::Value>,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            quality: 80,
            format: DEFAULT_ENCODING.to_string(),
            constraint: true,
            resizer: None,
            resizer_options: BTreeMap::new(),
        }
    }
}

impl FormatSettings {
    pub fn with_size(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Reject settings that can never produce a box.
    pub fn validate(&self) -> Result<(), InvalidFormat> {
        if self.width.is_none() && self.height.is_none() {
            return Err(InvalidFormat::new(
                "width and height cannot both be empty",
            ));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(InvalidFormat::new("width and height must be non-zero"));
        }
        if self.quality > 100 {
            return Err(InvalidFormat::new(format!(
                "quality must be 0-100, got {}",
                self.quality
            )));
        }
        if self.format.is_empty() {
            return Err(InvalidFormat::new("format encoding cannot be empty"));
        }
        Ok(())
    }
}

/// Ordered format catalog. Catalog order is key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatCatalog {
    formats: BTreeMap<String, FormatSettings>,
}

impl FormatCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validated format, replacing any previous one with the same name.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        settings: FormatSettings,
    ) -> Result<(), InvalidFormat> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidFormat::new("format name cannot be empty"));
        }
        if name == REFERENCE {
            return Err(InvalidFormat::new(format!(
                "'{REFERENCE}' is reserved for the original file"
            )));
        }
        settings
            .validate()
            .map_err(|e| InvalidFormat::new(format!("{name}: {}", e.0)))?;
        self.formats.insert(name, settings);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FormatSettings> {
        self.formats.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormatSettings)> {
        self.formats.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

/// Provider-level catalog key for a context format.
pub fn context_format_key(context: &str, format: &str) -> String {
    format!("{context}_{format}")
}

/// Whether a catalog key belongs to `context` (or is the admin format).
pub fn applies_to_context(key: &str, context: &str) -> bool {
    key == ADMIN
        || key
            .strip_prefix(context)
            .is_some_and(|rest| rest.starts_with('_'))
}
