use super::{Cdn, CdnError, FlushStatus};
use std::sync::Arc;

/// Serves content from `fallback` until the primary CDN has been flushed.
pub struct Fallback {
    cdn: Arc<dyn Cdn>,
    fallback: Arc<dyn Cdn>,
}

impl Fallback {
    pub fn new(cdn: Arc<dyn Cdn>, fallback: Arc<dyn Cdn>) -> Self {
        Self { cdn, fallback }
    }
}

impl Cdn for Fallback {
    fn get_path(&self, relative: &str, is_flushable: bool) -> String {
        if is_flushable {
            self.fallback.get_path(relative, is_flushable)
        } else {
            self.cdn.get_path(relative, is_flushable)
        }
    }

    fn flush_by_string(&self, string: &str) -> Result<Option<String>, CdnError> {
        self.cdn.flush_by_string(string)
    }

    fn flush(&self, path: &str) -> Result<Option<String>, CdnError> {
        self.cdn.flush(path)
    }

    fn flush_paths(&self, paths: &[String]) -> Result<Option<String>, CdnError> {
        self.cdn.flush_paths(paths)
    }

    fn get_flush_status(&self, identifier: &str) -> Result<FlushStatus, CdnError> {
        self.cdn.get_flush_status(identifier)
    }
}
