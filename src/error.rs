use thiserror::Error;

use crate::store::StoreError;

/// Failures that stop an ingestion call before any row is written.
///
/// Row-level validation failures are not errors here: they come back as a
/// rejected response carrying every offending row.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid request: {0}")]
    Input(&'static str),
    #[error("vendor {0} not found")]
    VendorNotFound(String),
    #[error("lookup failed: {0}")]
    Collaborator(#[source] StoreError),
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::Collaborator(err)
    }
}
