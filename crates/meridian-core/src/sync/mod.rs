//! Directory synchronization: rebuilds the endpoint-to-region mapping from
//! the external validation service and republishes it to the directory
//! store.

pub mod engine;
pub mod validation;

use thiserror::Error;

use crate::directory::store::StoreError;

/// Errors from a sync run or a single validation-service fetch.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The validation service was unreachable.
    #[error("validation service unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The validation service answered with a non-success, non-404 status.
    #[error("validation service returned status {0}")]
    BadStatus(u16),

    /// The validation-service payload was not the expected endpoint map.
    #[error("malformed validation payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Publishing the merged directory to the store failed.
    #[error("directory store write failed: {0}")]
    Publish(#[from] StoreError),
}

pub use engine::SyncEngine;
pub use validation::{ValidationClient, ValidationConfig};
