//! Provider and context registry.
//!
//! The pool is what the host application talks to: it resolves a media's
//! provider by name and knows which formats each context declares. Context
//! formats are keyed without the `<context>_` prefix that provider catalogs
//! use.

use crate::format::FormatCatalog;
use crate::imaging::Dimensions;
use crate::media::Media;
use crate::provider::MediaProvider;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    #[error("Provider \"{0}\" does not exist")]
    ProviderNotFound(String),
    #[error("Context \"{0}\" does not exist")]
    ContextNotFound(String),
    #[error("Media \"{0}\" has no dimensions")]
    MissingDimensions(String),
    #[error("Upload is {actual}, the \"{context}\" context needs at least {required}")]
    UploadTooSmall {
        context: String,
        actual: Dimensions,
        required: Dimensions,
    },
}

/// A named group of formats and the providers allowed to store into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub name: String,
    pub providers: Vec<String>,
    pub formats: FormatCatalog,
}

pub struct Pool {
    default_context: String,
    providers: BTreeMap<String, Arc<dyn MediaProvider>>,
    contexts: BTreeMap<String, Context>,
}

impl Pool {
    pub fn new(default_context: impl Into<String>) -> Self {
        Self {
            default_context: default_context.into(),
            providers: BTreeMap::new(),
            contexts: BTreeMap::new(),
        }
    }

    pub fn add_provider(&mut self, name: impl Into<String>, provider: Arc<dyn MediaProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get_provider(&self, name: &str) -> Result<Arc<dyn MediaProvider>, PoolError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| PoolError::ProviderNotFound(name.to_string()))
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Register or replace a context.
    pub fn add_context(
        &mut self,
        name: impl Into<String>,
        providers: Vec<String>,
        formats: FormatCatalog,
    ) {
        let name = name.into();
        debug!(
            context = %name,
            providers = providers.len(),
            formats = formats.len(),
            "Context registered"
        );
        self.contexts.insert(
            name.clone(),
            Context {
                name,
                providers,
                formats,
            },
        );
    }

    pub fn has_context(&self, name: &str) -> bool {
        self.contexts.contains_key(name)
    }

    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.contexts.get(name)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.contexts.values()
    }

    pub fn default_context(&self) -> &str {
        &self.default_context
    }

    /// Unprefixed format names of `context`, `None` when it does not exist.
    pub fn get_format_names_by_context(&self, context: &str) -> Option<Vec<String>> {
        self.contexts
            .get(context)
            .map(|c| c.formats.names().map(str::to_string).collect())
    }

    pub fn get_providers_by_context(
        &self,
        context: &str,
    ) -> Result<Vec<Arc<dyn MediaProvider>>, PoolError> {
        let context = self
            .contexts
            .get(context)
            .ok_or_else(|| PoolError::ContextNotFound(context.to_string()))?;
        context
            .providers
            .iter()
            .map(|name| self.get_provider(name))
            .collect()
    }

    /// Reject uploads smaller than the largest constrained format of their
    /// context. Media without a context are checked against the default.
    pub fn validate_upload_dimensions(&self, media: &Media) -> Result<(), PoolError> {
        let name = media.context.as_deref().unwrap_or(self.default_context.as_str());
        let context = self
            .contexts
            .get(name)
            .ok_or_else(|| PoolError::ContextNotFound(name.to_string()))?;

        let required = context
            .formats
            .iter()
            .filter(|(_, settings)| settings.constraint)
            .fold(Dimensions::new(0, 0), |acc, (_, settings)| {
                Dimensions::new(
                    acc.width.max(settings.width.unwrap_or(0)),
                    acc.height.max(settings.height.unwrap_or(0)),
                )
            });
        if required.width == 0 && required.height == 0 {
            return Ok(());
        }

        let actual = media.dimensions.ok_or_else(|| {
            let id = media.id.as_ref().map(|id| id.to_string());
            PoolError::MissingDimensions(id.unwrap_or_default())
        })?;
        if actual.width < required.width || actual.height < required.height {
            return Err(PoolError::UploadTooSmall {
                context: name.to_string(),
                actual,
                required,
            });
        }
        Ok(())
    }
}
