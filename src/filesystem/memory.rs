use super::{Adapter, FilesystemError, Result};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

struct Entry {
    content: Vec<u8>,
    mtime: SystemTime,
}

/// Process-local storage. Nothing survives the process.
#[derive(Default)]
pub struct MemoryAdapter {
    files: Mutex<BTreeMap<String, Entry>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> Result<MutexGuard<'_, BTreeMap<String, Entry>>> {
        self.files
            .lock()
            .map_err(|_| FilesystemError::Io(std::io::Error::other("memory adapter poisoned")))
    }
}

impl Adapter for MemoryAdapter {
    fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.files()?
            .get(key)
            .map(|entry| entry.content.clone())
            .ok_or_else(|| FilesystemError::NotFound(key.to_string()))
    }

    fn write(&self, key: &str, content: &[u8]) -> Result<bool> {
        self.files()?.insert(
            key.to_string(),
            Entry {
                content: content.to_vec(),
                mtime: SystemTime::now(),
            },
        );
        Ok(true)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.files()?.contains_key(key))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.files()?.keys().cloned().collect())
    }

    fn mtime(&self, key: &str) -> Result<SystemTime> {
        self.files()?
            .get(key)
            .map(|entry| entry.mtime)
            .ok_or_else(|| FilesystemError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.files()?.remove(key).is_some())
    }

    fn rename(&self, source: &str, target: &str) -> Result<bool> {
        let mut files = self.files()?;
        match files.remove(source) {
            Some(entry) => {
                files.insert(target.to_string(), entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn is_directory(&self, key: &str) -> Result<bool> {
        let prefix = format!("{}/", key.trim_end_matches('/'));
        Ok(self.files()?.keys().any(|k| k.starts_with(&prefix)))
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
