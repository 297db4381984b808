use super::{Cdn, CdnError, ClientError, FlushStatus, join_path};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// A `CreateInvalidation` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRequest {
    pub distribution_id: String,
    pub caller_reference: String,
    pub paths: Vec<String>,
}

/// Invalidation as returned by CloudFront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub id: String,
    pub status: String,
}

/// Transport for the two CloudFront calls the pipeline needs.
pub trait CloudFrontClient: Send + Sync {
    fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<Invalidation, ClientError>;

    fn get_invalidation(
        &self,
        distribution_id: &str,
        id: &str,
    ) -> Result<Invalidation, ClientError>;
}

pub struct CloudFront {
    path: String,
    distribution_id: String,
    client: Arc<dyn CloudFrontClient>,
}

impl CloudFront {
    pub fn new(
        path: impl Into<String>,
        distribution_id: impl Into<String>,
        client: Arc<dyn CloudFrontClient>,
    ) -> Self {
        Self {
            path: path.into(),
            distribution_id: distribution_id.into(),
            client,
        }
    }
}

/// Idempotency token for a batch: hex SHA-256 of the sorted, comma-joined paths.
pub fn caller_reference(paths: &[String]) -> String {
    let mut sorted = paths.to_vec();
    sorted.sort();
    let digest = Sha256::digest(sorted.join(",").as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// CloudFront object paths always start with a single `/`.
fn normalize(paths: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = paths
        .iter()
        .map(|p| format!("/{}", p.trim_start_matches('/')))
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

fn flush_failed(paths: &[String], source: Option<ClientError>) -> CdnError {
    CdnError::FlushFailed {
        message: format!("Unable to flush paths \"{}\".", paths.join("\", \"")),
        source,
    }
}

impl Cdn for CloudFront {
    fn get_path(&self, relative: &str, _is_flushable: bool) -> String {
        join_path(&self.path, relative)
    }

    fn flush_paths(&self, paths: &[String]) -> Result<Option<String>, CdnError> {
        if paths.is_empty() {
            return Err(CdnError::NothingToFlush);
        }
        let normalized = normalize(paths);
        let request = InvalidationRequest {
            distribution_id: self.distribution_id.clone(),
            caller_reference: caller_reference(&normalized),
            paths: normalized,
        };

        let invalidation = self
            .client
            .create_invalidation(&request)
            .map_err(|e| flush_failed(paths, Some(e)))?;
        if !matches!(invalidation.status.as_str(), "Completed" | "InProgress") {
            return Err(CdnError::FlushFailed {
                message: format!(
                    "Unable to flush paths \"{}\": invalidation \"{}\" has status \"{}\".",
                    paths.join("\", \""),
                    invalidation.id,
                    invalidation.status
                ),
                source: None,
            });
        }

        debug!(
            distribution = %self.distribution_id,
            invalidation = %invalidation.id,
            count = request.paths.len(),
            "Invalidation created"
        );
        Ok(Some(invalidation.id))
    }

    fn get_flush_status(&self, identifier: &str) -> Result<FlushStatus, CdnError> {
        let invalidation = self
            .client
            .get_invalidation(&self.distribution_id, identifier)
            .map_err(|source| CdnError::Status {
                identifier: identifier.to_string(),
                source,
            })?;
        Ok(match invalidation.status.as_str() {
            "Completed" => FlushStatus::Ok,
            "InProgress" => FlushStatus::Waiting,
            _ => FlushStatus::Error,
        })
    }
}
