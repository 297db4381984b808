use super::{Cdn, CdnError, ClientError, FlushStatus, join_path};
use std::sync::Arc;

const ACCEPTED: &str = "Flush successfully submitted.";

/// A PantherPortal flush submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PantherFlush {
    pub username: String,
    pub password: String,
    pub flush_type: String,
    pub site_id: String,
    /// Newline-separated.
    pub paths: String,
    pub wildcard: bool,
}

/// Transport for the PantherPortal flush endpoint; returns the raw answer.
pub trait PantherClient: Send + Sync {
    fn flush(&self, request: &PantherFlush) -> Result<String, ClientError>;
}

pub struct PantherPortal {
    path: String,
    username: String,
    password: String,
    site_id: String,
    client: Arc<dyn PantherClient>,
}

impl PantherPortal {
    pub fn new(
        path: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        site_id: impl Into<String>,
        client: Arc<dyn PantherClient>,
    ) -> Self {
        Self {
            path: path.into(),
            username: username.into(),
            password: password.into(),
            site_id: site_id.into(),
            client,
        }
    }
}

impl Cdn for PantherPortal {
    fn get_path(&self, relative: &str, _is_flushable: bool) -> String {
        join_path(&self.path, relative)
    }

    fn flush_paths(&self, paths: &[String]) -> Result<Option<String>, CdnError> {
        let request = PantherFlush {
            username: self.username.clone(),
            password: self.password.clone(),
            flush_type: "paths".to_string(),
            site_id: self.site_id.clone(),
            paths: paths.join("\n"),
            wildcard: true,
        };
        let answer = self
            .client
            .flush(&request)
            .map_err(|e| CdnError::Rejected(e.to_string()))?;
        if answer != ACCEPTED {
            return Err(CdnError::Rejected(answer));
        }
        Ok(None)
    }

    fn get_flush_status(&self, _identifier: &str) -> Result<FlushStatus, CdnError> {
        Ok(FlushStatus::Ok)
    }
}
