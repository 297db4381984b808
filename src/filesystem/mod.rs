//! Key/value storage for originals and derived artifacts.
//!
//! Backends implement the small [`Adapter`] trait; [`Filesystem`] layers the
//! existence checks and overwrite rules on top, and hands out [`File`]
//! handles that resizers read from and write to.
//!
//! | Adapter | Storage |
//! |---|---|
//! | [`LocalAdapter`] | a directory on local disk |
//! | [`MemoryAdapter`] | a process-local map |
//! | [`ReplicateAdapter`] | two adapters, primary + write mirror |
//!
//! Object stores (S3 and compatible) plug in by implementing [`Adapter`] and
//! answering `true` from [`Adapter::is_s3_backed`].

mod local;
mod memory;
mod replicate;

pub use local::LocalAdapter;
pub use memory::MemoryAdapter;
pub use replicate::ReplicateAdapter;

use crate::metadata::Metadata;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("The file \"{0}\" was not found")]
    NotFound(String),
    #[error("The file \"{0}\" already exists")]
    AlreadyExists(String),
    #[error("Could not write the \"{0}\" key content")]
    WriteFailed(String),
    #[error("Could not delete the \"{0}\" key")]
    DeleteFailed(String),
    #[error("Could not rename \"{from}\" to \"{to}\"")]
    RenameFailed { from: String, to: String },
    #[error("Invalid key \"{0}\"")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, FilesystemError>;

/// A storage backend.
///
/// `write`, `delete` and `rename` report success as a boolean so that
/// wrappers can aggregate partial failures; errors are reserved for
/// conditions the backend could not even attempt.
pub trait Adapter: Send + Sync {
    fn read(&self, key: &str) -> Result<Vec<u8>>;

    fn write(&self, key: &str, content: &[u8]) -> Result<bool>;

    fn exists(&self, key: &str) -> Result<bool>;

    /// All stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>>;

    fn mtime(&self, key: &str) -> Result<SystemTime>;

    fn delete(&self, key: &str) -> Result<bool>;

    fn rename(&self, source: &str, target: &str) -> Result<bool>;

    fn is_directory(&self, key: &str) -> Result<bool>;

    /// Short identifier of the concrete backend (`local`, `memory`, ...).
    fn kind(&self) -> &'static str;

    /// Identifiers of every concrete backend behind this adapter.
    fn adapter_kinds(&self) -> Vec<&'static str> {
        vec![self.kind()]
    }

    /// Whether this adapter stores objects in an S3-compatible store.
    fn is_s3_backed(&self) -> bool {
        false
    }

    fn supports_metadata(&self) -> bool {
        false
    }

    fn set_metadata(&self, _key: &str, _metadata: &Metadata) -> Result<()> {
        Ok(())
    }

    fn get_metadata(&self, _key: &str) -> Result<Metadata> {
        Ok(Metadata::new())
    }
}

/// Existence-checked access to an [`Adapter`].
pub struct Filesystem {
    adapter: Arc<dyn Adapter>,
}

impl Filesystem {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        self.adapter.exists(key)
    }

    pub fn read(&self, key: &str) -> Result<Vec<u8>> {
        if !self.has(key)? {
            return Err(FilesystemError::NotFound(key.to_string()));
        }
        self.adapter.read(key)
    }

    /// Write `content` under `key`, returning the number of bytes written.
    pub fn write(&self, key: &str, content: &[u8], overwrite: bool) -> Result<usize> {
        if !overwrite && self.has(key)? {
            return Err(FilesystemError::AlreadyExists(key.to_string()));
        }
        if !self.adapter.write(key, content)? {
            return Err(FilesystemError::WriteFailed(key.to_string()));
        }
        Ok(content.len())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        if !self.has(key)? {
            return Err(FilesystemError::NotFound(key.to_string()));
        }
        if !self.adapter.delete(key)? {
            return Err(FilesystemError::DeleteFailed(key.to_string()));
        }
        Ok(())
    }

    pub fn rename(&self, source: &str, target: &str) -> Result<()> {
        if !self.has(source)? {
            return Err(FilesystemError::NotFound(source.to_string()));
        }
        if self.has(target)? {
            return Err(FilesystemError::AlreadyExists(target.to_string()));
        }
        if !self.adapter.rename(source, target)? {
            return Err(FilesystemError::RenameFailed {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.adapter.keys()
    }

    pub fn mtime(&self, key: &str) -> Result<SystemTime> {
        if !self.has(key)? {
            return Err(FilesystemError::NotFound(key.to_string()));
        }
        self.adapter.mtime(key)
    }

    /// A handle on `key`. Unless `create` is set the key must already exist.
    pub fn get(self: &Arc<Self>, key: &str, create: bool) -> Result<File> {
        if !create && !self.has(key)? {
            return Err(FilesystemError::NotFound(key.to_string()));
        }
        Ok(File {
            key: key.to_string(),
            filesystem: Arc::clone(self),
        })
    }

    pub fn is_s3_backed(&self) -> bool {
        self.adapter.is_s3_backed()
    }

    pub fn supports_metadata(&self) -> bool {
        self.adapter.supports_metadata()
    }

    pub fn get_metadata(&self, key: &str) -> Result<Metadata> {
        self.adapter.get_metadata(key)
    }
}

/// A key inside a [`Filesystem`].
#[derive(Clone)]
pub struct File {
    key: String,
    filesystem: Arc<Filesystem>,
}

impl File {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Basename of the key.
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    pub fn exists(&self) -> Result<bool> {
        self.filesystem.has(&self.key)
    }

    pub fn content(&self) -> Result<Vec<u8>> {
        self.filesystem.read(&self.key)
    }

    /// Replace the content. Metadata is pushed first when the backend supports it.
    pub fn set_content(&self, content: &[u8], metadata: &Metadata) -> Result<usize> {
        if !metadata.is_empty() && self.filesystem.supports_metadata() {
            self.filesystem.adapter.set_metadata(&self.key, metadata)?;
        }
        self.filesystem.write(&self.key, content, true)
    }

    pub fn delete(&self) -> Result<()> {
        self.filesystem.delete(&self.key)
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File").field("key", &self.key).finish()
    }
}
