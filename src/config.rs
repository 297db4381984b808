//! Pipeline configuration.
//!
//! Loads and validates `media.toml` and assembles the provider [`Pool`] it
//! describes. Every section is optional; the stock defaults store images on
//! local disk below `uploads/` and serve them from `/uploads/media`.
//!
//! ## Configuration Options
//!
//! ```toml
//! default_context = "default"
//!
//! [admin_format]            # generated for every media
//! width = 200
//! quality = 80
//!
//! [filesystem.primary]
//! adapter = "local"         # local | memory
//! directory = "uploads"
//! create = true
//!
//! # [filesystem.secondary]  # mirror every write
//! # adapter = "local"
//! # directory = "/mnt/backup"
//!
//! [cdn]
//! server = "/uploads/media" # URL prefix of stored files
//!
//! [metadata]
//! builder = "noop"          # noop | amazon | proxy
//!
//! [generator]
//! first_level = 100000      # ids per first directory level
//! second_level = 1000       # ids per second directory level
//!
//! [resizers.simple]
//! mode = "inset"            # inset | outbound
//!
//! [providers.image]
//! generator = "id"          # id | uuid | path
//! resizer = "simple"        # simple | square | crop, "" for originals only
//! thumbnail = "format"      # format | cache
//!
//! [contexts.default]
//! providers = ["image"]
//!
//! [contexts.default.formats.small]
//! width = 100
//! quality = 70
//!
//! [processing]
//! max_processes = 4         # Max parallel resizes (omit for auto = CPU cores)
//! ```
//!
//! Declaring any `[contexts.*]` or `[providers.*]` table replaces the stock
//! entries of that section. Unknown keys are rejected to catch typos early.

use crate::cdn::{Cdn, Server};
use crate::filesystem::{
    Adapter, Filesystem, FilesystemError, LocalAdapter, MemoryAdapter, ReplicateAdapter,
};
use crate::format::{ADMIN, FormatCatalog, FormatSettings, context_format_key};
use crate::generator::{Generator, IdGenerator, PathGenerator, UuidGenerator};
use crate::imaging::{ImageBackend, Mode};
use crate::metadata::{
    AmazonMetadataBuilder, AmazonSettings, MetadataBuilder, MetadataError, NoopMetadataBuilder,
    ProxyMetadataBuilder,
};
use crate::pool::Pool;
use crate::provider::{DEFAULT_IMAGE_EXTENSIONS, ImageProvider, MediaProvider};
use crate::resizer::ResizerRegistry;
use crate::thumbnail::{CacheResolverThumbnail, FormatThumbnail, Thumbnail, WebPathResolver};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// File looked up by [`load_config`].
pub const CONFIG_FILE: &str = "media.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Pipeline configuration loaded from `media.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    /// Context used for media that do not name one.
    pub default_context: String,
    /// Cross-context format generated for every media.
    pub admin_format: FormatSettings,
    pub filesystem: FilesystemConfig,
    pub cdn: CdnConfig,
    pub metadata: MetadataConfig,
    pub generator: GeneratorConfig,
    pub resizers: ResizersConfig,
    pub providers: BTreeMap<String, ProviderConfig>,
    pub contexts: BTreeMap<String, ContextConfig>,
    pub processing: ProcessingConfig,
}

impl Default for MediaConfig {
    fn default() -> Self {
        let mut small = FormatSettings::with_size(Some(100), None);
        small.quality = 70;
        let mut big = FormatSettings::with_size(Some(500), None);
        big.quality = 70;

        Self {
            default_context: "default".to_string(),
            admin_format: FormatSettings::with_size(Some(200), None),
            filesystem: FilesystemConfig::default(),
            cdn: CdnConfig::default(),
            metadata: MetadataConfig::default(),
            generator: GeneratorConfig::default(),
            resizers: ResizersConfig::default(),
            providers: BTreeMap::from([("image".to_string(), ProviderConfig::default())]),
            contexts: BTreeMap::from([(
                "default".to_string(),
                ContextConfig {
                    providers: vec!["image".to_string()],
                    formats: BTreeMap::from([
                        ("small".to_string(), small),
                        ("big".to_string(), big),
                    ]),
                },
            )]),
            processing: ProcessingConfig::default(),
        }
    }
}

/// Where stored files live.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesystemConfig {
    pub primary: AdapterConfig,
    /// Replica receiving every mutation of the primary.
    pub secondary: Option<AdapterConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    #[default]
    Local,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    pub adapter: AdapterKind,
    /// Root directory, `local` only.
    pub directory: Option<PathBuf>,
    /// Create the directory when missing.
    pub create: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            adapter: AdapterKind::Local,
            directory: Some(PathBuf::from("uploads")),
            create: true,
        }
    }
}

impl AdapterConfig {
    fn build(&self) -> Result<Arc<dyn Adapter>, ConfigError> {
        let adapter: Arc<dyn Adapter> = match self.adapter {
            AdapterKind::Memory => Arc::new(MemoryAdapter::new()),
            AdapterKind::Local => {
                let directory = self.directory.as_ref().ok_or_else(|| {
                    ConfigError::Validation("filesystem: local adapter needs a directory".into())
                })?;
                Arc::new(LocalAdapter::new(directory, self.create)?)
            }
        };
        Ok(adapter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CdnConfig {
    /// URL prefix stored files are served from.
    pub server: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            server: "/uploads/media".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataKind {
    #[default]
    Noop,
    Amazon,
    /// Amazon metadata for S3-backed providers, none for the rest.
    Proxy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    pub builder: MetadataKind,
    pub amazon: AmazonSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub first_level: u64,
    pub second_level: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            first_level: IdGenerator::DEFAULT_FIRST_LEVEL,
            second_level: IdGenerator::DEFAULT_SECOND_LEVEL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizerModeConfig {
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizersConfig {
    pub simple: ResizerModeConfig,
    pub square: ResizerModeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    #[default]
    Id,
    Uuid,
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailKind {
    /// Generate every format on upload.
    #[default]
    Format,
    /// Leave generation to an on-demand image cache.
    Cache,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub generator: GeneratorKind,
    /// Resizer by registry name; empty stores originals only.
    pub resizer: Option<String>,
    pub thumbnail: ThumbnailKind,
    /// URL prefix of the image cache, `cache` thumbnails only.
    pub cache_prefix: String,
    pub allowed_extensions: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorKind::Id,
            resizer: Some("simple".to_string()),
            thumbnail: ThumbnailKind::Format,
            cache_prefix: "/media/cache".to_string(),
            allowed_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    pub providers: Vec<String>,
    /// Formats keyed without the context prefix.
    pub formats: BTreeMap<String, FormatSettings>,
}

impl ContextConfig {
    fn catalog(&self, context: &str) -> Result<FormatCatalog, ConfigError> {
        let mut catalog = FormatCatalog::new();
        for (name, settings) in &self.formats {
            catalog
                .insert(name.clone(), settings.clone())
                .map_err(|e| {
                    ConfigError::Validation(format!("contexts.{context}.formats: {}", e.0))
                })?;
        }
        Ok(catalog)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel resize workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

impl MediaConfig {
    /// Check cross references and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.contexts.contains_key(&self.default_context) {
            return Err(ConfigError::Validation(format!(
                "default_context \"{}\" is not declared in [contexts]",
                self.default_context
            )));
        }
        self.admin_format
            .validate()
            .map_err(|e| ConfigError::Validation(format!("admin_format: {}", e.0)))?;
        if self.generator.first_level == 0 || self.generator.second_level == 0 {
            return Err(ConfigError::Validation(
                "generator levels must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.cdn.server.is_empty() {
            return Err(ConfigError::Validation("cdn.server cannot be empty".into()));
        }

        for (name, provider) in &self.providers {
            if let Some(resizer) = &provider.resizer
                && !matches!(resizer.as_str(), "" | "simple" | "square" | "crop")
            {
                return Err(ConfigError::Validation(format!(
                    "providers.{name}.resizer: unknown resizer \"{resizer}\""
                )));
            }
            if provider.allowed_extensions.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "providers.{name}.allowed_extensions cannot be empty"
                )));
            }
        }

        for (name, context) in &self.contexts {
            if context.formats.contains_key(ADMIN) {
                return Err(ConfigError::Validation(format!(
                    "contexts.{name}.formats: \"{ADMIN}\" is configured by admin_format"
                )));
            }
            for provider in &context.providers {
                if !self.providers.contains_key(provider) {
                    return Err(ConfigError::Validation(format!(
                        "contexts.{name}.providers: unknown provider \"{provider}\""
                    )));
                }
            }
            context.catalog(name)?;
            for (format, settings) in &context.formats {
                if let Some(resizer) = &settings.resizer
                    && !matches!(resizer.as_str(), "simple" | "square" | "crop")
                {
                    return Err(ConfigError::Validation(format!(
                        "contexts.{name}.formats.{format}.resizer: unknown resizer \"{resizer}\""
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: MediaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Provider catalog: the `<context>_<format>` entries of every context
    /// listing `provider`, plus the admin format.
    pub fn provider_formats(&self, provider: &str) -> Result<FormatCatalog, ConfigError> {
        let mut catalog = FormatCatalog::new();
        for (context, config) in &self.contexts {
            if !config.providers.iter().any(|p| p == provider) {
                continue;
            }
            for (format, settings) in &config.formats {
                catalog
                    .insert(context_format_key(context, format), settings.clone())
                    .map_err(|e| ConfigError::Validation(e.0))?;
            }
        }
        catalog
            .insert(ADMIN, self.admin_format.clone())
            .map_err(|e| ConfigError::Validation(e.0))?;
        Ok(catalog)
    }

    fn build_filesystem(&self) -> Result<Arc<Filesystem>, ConfigError> {
        let primary = self.filesystem.primary.build()?;
        let adapter: Arc<dyn Adapter> = match &self.filesystem.secondary {
            Some(secondary) => Arc::new(ReplicateAdapter::new(primary, secondary.build()?)),
            None => primary,
        };
        debug!(backends = ?adapter.adapter_kinds(), "Filesystem ready");
        Ok(Arc::new(Filesystem::new(adapter)))
    }

    fn build_metadata(
        &self,
        filesystem: &Arc<Filesystem>,
    ) -> Result<Arc<dyn MetadataBuilder>, ConfigError> {
        let amazon = || AmazonMetadataBuilder::new(self.metadata.amazon.clone());
        let builder: Arc<dyn MetadataBuilder> = match self.metadata.builder {
            MetadataKind::Noop => Arc::new(NoopMetadataBuilder),
            MetadataKind::Amazon => Arc::new(amazon()?),
            MetadataKind::Proxy => {
                let mut proxy = ProxyMetadataBuilder::new()
                    .with_amazon(Arc::new(amazon()?))
                    .with_noop(Arc::new(NoopMetadataBuilder));
                for name in self.providers.keys() {
                    proxy = proxy.register_provider(name.clone(), filesystem.clone());
                }
                Arc::new(proxy)
            }
        };
        Ok(builder)
    }

    fn build_generator(&self, kind: GeneratorKind) -> Arc<dyn Generator> {
        match kind {
            GeneratorKind::Id => Arc::new(IdGenerator::new(
                self.generator.first_level,
                self.generator.second_level,
            )),
            GeneratorKind::Uuid => Arc::new(UuidGenerator),
            GeneratorKind::Path => Arc::new(PathGenerator),
        }
    }

    /// Assemble providers and contexts over one shared filesystem and CDN.
    pub fn build_pool(&self, backend: Arc<dyn ImageBackend>) -> Result<Pool, ConfigError> {
        self.validate()?;

        let filesystem = self.build_filesystem()?;
        let cdn: Arc<dyn Cdn> = Arc::new(Server::new(self.cdn.server.clone()));
        let metadata = self.build_metadata(&filesystem)?;
        let resizers = ResizerRegistry::standard(
            backend.clone(),
            metadata,
            self.resizers.simple.mode,
            self.resizers.square.mode,
        );

        let mut pool = Pool::new(self.default_context.clone());
        for (name, config) in &self.providers {
            let thumbnail: Arc<dyn Thumbnail> = match config.thumbnail {
                ThumbnailKind::Format => {
                    Arc::new(FormatThumbnail::default().with_resizers(resizers.clone()))
                }
                ThumbnailKind::Cache => Arc::new(CacheResolverThumbnail::new(WebPathResolver::new(
                    config.cache_prefix.clone(),
                ))),
            };
            let mut provider = ImageProvider::new(
                name.clone(),
                filesystem.clone(),
                cdn.clone(),
                self.build_generator(config.generator),
                thumbnail,
                backend.clone(),
            )
            .with_allowed_extensions(config.allowed_extensions.iter().cloned());
            if let Some(resizer) = config
                .resizer
                .as_deref()
                .filter(|r| !r.is_empty())
                .and_then(|r| resizers.get(r))
            {
                provider = provider.with_resizer(resizer);
            }
            for (format, settings) in self.provider_formats(name)?.iter() {
                provider
                    .add_format(format, settings.clone())
                    .map_err(|e| ConfigError::Validation(e.to_string()))?;
            }
            debug!(provider = %name, formats = provider.formats().len(), "Provider ready");
            pool.add_provider(name.clone(), Arc::new(provider));
        }

        for (name, context) in &self.contexts {
            pool.add_context(name.clone(), context.providers.clone(), context.catalog(name)?);
        }
        Ok(pool)
    }
}

/// Load `media.toml` from `dir`, falling back to the stock defaults when the
/// file does not exist.
pub fn load_config(dir: &Path) -> Result<MediaConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(MediaConfig::default());
    }
    MediaConfig::load(&path)
}

/// Returns a fully-commented stock `media.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Media Pipeline Configuration
# ============================
# All settings are optional. Values shown below are the defaults.
# Declaring any [providers.*] or [contexts.*] table replaces the stock
# entries of that section. Unknown keys will cause an error.

# Context used for media that do not name one.
default_context = "default"

# ---------------------------------------------------------------------------
# Admin format, generated for every media whatever its context.
# ---------------------------------------------------------------------------
[admin_format]
width = 200
quality = 80

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
# adapter: "local" (files below `directory`) or "memory" (lost on exit).
[filesystem.primary]
adapter = "local"
directory = "uploads"
create = true

# Uncomment to mirror every write, rename and delete onto a second adapter.
# [filesystem.secondary]
# adapter = "local"
# directory = "/mnt/backup/uploads"

# ---------------------------------------------------------------------------
# Public URLs
# ---------------------------------------------------------------------------
[cdn]
server = "/uploads/media"

# ---------------------------------------------------------------------------
# Metadata attached to written files
# ---------------------------------------------------------------------------
# builder: "noop", "amazon" or "proxy" (amazon for S3-backed storage only).
[metadata]
builder = "noop"

[metadata.amazon]
acl = "public"            # private | public | open | auth_read | owner_read | owner_full_control
storage = "standard"      # standard | reduced
# cache_control = "max-age=86400"
# encryption = "AES256"

# ---------------------------------------------------------------------------
# Directory layout for numeric ids: <context>/<id / first>/<id / second>
# ---------------------------------------------------------------------------
[generator]
first_level = 100000
second_level = 1000

# ---------------------------------------------------------------------------
# Resizer modes: "inset" fits inside the box, "outbound" covers it.
# ---------------------------------------------------------------------------
[resizers.simple]
mode = "inset"

[resizers.square]
mode = "inset"

# ---------------------------------------------------------------------------
# Providers
# ---------------------------------------------------------------------------
[providers.image]
generator = "id"          # id | uuid | path
resizer = "simple"        # simple | square | crop, "" to store originals only
thumbnail = "format"      # format | cache
cache_prefix = "/media/cache"
allowed_extensions = ["jpg", "jpeg", "png", "webp", "tif", "tiff"]

# ---------------------------------------------------------------------------
# Contexts and their formats
# ---------------------------------------------------------------------------
# Format keys: width, height, quality (0-100), format (fallback encoding),
# constraint (counts toward minimum upload size), resizer (override).
[contexts.default]
providers = ["image"]

[contexts.default.formats.small]
width = 100
quality = 70

[contexts.default.formats.big]
width = 500
quality = 70

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# max_processes = 4       # Max parallel resizes (omit for auto = CPU cores)
"##
}
