//! CDN path building and edge cache invalidation.
//!
//! | Backend | Paths | Flush |
//! |---|---|---|
//! | [`Server`] | `base/relative` | no-op, always [`FlushStatus::Ok`] |
//! | [`CloudFront`] | `base/relative` | invalidation batch via [`CloudFrontClient`] |
//! | [`PantherPortal`] | `base/relative` | newline-joined list via [`PantherClient`] |
//! | [`Fallback`] | fallback while flushable, primary after | primary |
//!
//! The HTTP transports stay behind client traits; the crate ships no
//! network stack.

mod cloudfront;
mod fallback;
mod panther;
mod server;

pub use cloudfront::{
    CloudFront, CloudFrontClient, Invalidation, InvalidationRequest, caller_reference,
};
pub use fallback::Fallback;
pub use panther::{PantherClient, PantherFlush, PantherPortal};
pub use server::Server;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised by a CDN client transport.
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// State of an invalidation as reported by the CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushStatus {
    Ok,
    ToSend,
    ToFlush,
    Error,
    Waiting,
}

impl fmt::Display for FlushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::ToSend => "to send",
            Self::ToFlush => "to flush",
            Self::Error => "error",
            Self::Waiting => "waiting",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CdnError {
    #[error("Unable to flush: expected at least one path")]
    NothingToFlush,
    #[error("{message}")]
    FlushFailed {
        message: String,
        #[source]
        source: Option<ClientError>,
    },
    #[error("Unable to retrieve flush status for \"{identifier}\": {source}")]
    Status {
        identifier: String,
        #[source]
        source: ClientError,
    },
    #[error("Unable to flush: {0}")]
    Rejected(String),
}

pub trait Cdn: Send + Sync {
    /// Public URL of `relative`.
    fn get_path(&self, relative: &str, is_flushable: bool) -> String;

    /// Invalidate a single path, or a wildcard string.
    fn flush_by_string(&self, string: &str) -> Result<Option<String>, CdnError> {
        self.flush_paths(&[string.to_string()])
    }

    fn flush(&self, path: &str) -> Result<Option<String>, CdnError> {
        self.flush_paths(&[path.to_string()])
    }

    /// Invalidate `paths`, returning the backend's invalidation identifier
    /// when it issues one.
    fn flush_paths(&self, paths: &[String]) -> Result<Option<String>, CdnError>;

    fn get_flush_status(&self, identifier: &str) -> Result<FlushStatus, CdnError>;
}

/// `base` and `relative` joined by exactly one `/`.
pub(crate) fn join_path(base: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}
