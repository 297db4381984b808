use super::{Adapter, FilesystemError, Result};
use crate::metadata::Metadata;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::error;

/// Mirrors writes onto a secondary adapter.
///
/// Mutations are attempted on both sides even when the primary fails, and
/// succeed only if both did. Reads are served by the primary alone.
pub struct ReplicateAdapter {
    primary: Arc<dyn Adapter>,
    secondary: Arc<dyn Adapter>,
}

impl ReplicateAdapter {
    pub fn new(primary: Arc<dyn Adapter>, secondary: Arc<dyn Adapter>) -> Self {
        Self { primary, secondary }
    }

    /// Run `op` against both sides, logging every failure.
    fn replicate(
        &self,
        action: &str,
        key: &str,
        op: impl Fn(&dyn Adapter) -> Result<bool>,
    ) -> bool {
        let mut ok = true;
        for (side, adapter) in [("primary", &self.primary), ("secondary", &self.secondary)] {
            match op(adapter.as_ref()) {
                Ok(true) => {}
                Ok(false) => {
                    error!(key, side, backend = adapter.kind(), "Unable to {action} key");
                    ok = false;
                }
                Err(e) => {
                    error!(
                        key,
                        side,
                        backend = adapter.kind(),
                        error = %e,
                        "Unable to {action} key"
                    );
                    ok = false;
                }
            }
        }
        ok
    }
}

impl Adapter for ReplicateAdapter {
    fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.primary.read(key)
    }

    fn write(&self, key: &str, content: &[u8]) -> Result<bool> {
        Ok(self.replicate("write", key, |a| a.write(key, content)))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.primary.exists(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.primary.keys()
    }

    fn mtime(&self, key: &str) -> Result<SystemTime> {
        self.primary.mtime(key)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.replicate("delete", key, |a| a.delete(key)))
    }

    fn rename(&self, source: &str, target: &str) -> Result<bool> {
        Ok(self.replicate("rename", source, |a| a.rename(source, target)))
    }

    fn is_directory(&self, key: &str) -> Result<bool> {
        self.primary.is_directory(key)
    }

    fn kind(&self) -> &'static str {
        "replicate"
    }

    fn adapter_kinds(&self) -> Vec<&'static str> {
        let mut kinds = self.primary.adapter_kinds();
        kinds.extend(self.secondary.adapter_kinds());
        kinds
    }

    fn is_s3_backed(&self) -> bool {
        self.primary.is_s3_backed() || self.secondary.is_s3_backed()
    }

    fn supports_metadata(&self) -> bool {
        self.primary.supports_metadata() || self.secondary.supports_metadata()
    }

    fn set_metadata(&self, key: &str, metadata: &Metadata) -> Result<()> {
        let mut first_error: Option<FilesystemError> = None;
        for adapter in [&self.primary, &self.secondary] {
            if !adapter.supports_metadata() {
                continue;
            }
            if let Err(e) = adapter.set_metadata(key, metadata) {
                error!(key, backend = adapter.kind(), error = %e, "Unable to set metadata");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn get_metadata(&self, key: &str) -> Result<Metadata> {
        if self.primary.supports_metadata() {
            return self.primary.get_metadata(key);
        }
        if self.secondary.supports_metadata() {
            return self.secondary.get_metadata(key);
        }
        Ok(Metadata::new())
    }
}
