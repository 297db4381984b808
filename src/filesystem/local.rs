use super::{Adapter, FilesystemError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Stores keys as files below a root directory.
///
/// Keys use `/` separators and map directly to relative paths; keys that
/// would escape the root are rejected.
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    root: PathBuf,
}

impl LocalAdapter {
    /// Open `root`, creating it when `create` is set.
    pub fn new(root: impl Into<PathBuf>, create: bool) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            if !create {
                return Err(FilesystemError::Io(std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("directory {} does not exist", root.display()),
                )));
            }
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(FilesystemError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl Adapter for LocalAdapter {
    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FilesystemError::NotFound(key.to_string()),
            _ => FilesystemError::Io(e),
        })
    }

    fn write(&self, key: &str, content: &[u8]) -> Result<bool> {
        let path = self.path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(true)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path(key)?.exists())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| FilesystemError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let key: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect();
                keys.push(key.join("/"));
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn mtime(&self, key: &str) -> Result<SystemTime> {
        let path = self.path(key)?;
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FilesystemError::NotFound(key.to_string()),
            _ => FilesystemError::Io(e),
        })?;
        Ok(metadata.modified()?)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path(key)?;
        if path.is_dir() {
            return Ok(false);
        }
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn rename(&self, source: &str, target: &str) -> Result<bool> {
        let from = self.path(source)?;
        let to = self.path(target)?;
        if !from.exists() {
            return Ok(false);
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)?;
        Ok(true)
    }

    fn is_directory(&self, key: &str) -> Result<bool> {
        Ok(self.path(key)?.is_dir())
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}
