use super::{Cdn, CdnError, FlushStatus, join_path};

/// Files served straight from the origin or a reverse proxy in front of it.
#[derive(Debug, Clone)]
pub struct Server {
    path: String,
}

impl Server {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Cdn for Server {
    fn get_path(&self, relative: &str, _is_flushable: bool) -> String {
        join_path(&self.path, relative)
    }

    fn flush_paths(&self, _paths: &[String]) -> Result<Option<String>, CdnError> {
        Ok(None)
    }

    fn get_flush_status(&self, _identifier: &str) -> Result<FlushStatus, CdnError> {
        Ok(FlushStatus::Ok)
    }
}
