//! The endpoint directory: the mapping from (category, region) buckets to
//! candidate upstream endpoints, its serialized wire format, the shared
//! store it is published to, and the per-instance cache the forwarding
//! engine reads.

pub mod cache;
pub mod store;

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::debug;

use crate::types::DirectoryKey;

/// Store key under which the full serialized directory lives. One sync run
/// replaces the whole entry in a single write.
pub const DIRECTORY_STORE_KEY: &str = "all";

/// Errors produced while decoding or encoding a directory payload.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Payload was not valid JSON or not the expected object-of-arrays shape.
    #[error("malformed directory payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Mapping from [`DirectoryKey`] to an ordered list of endpoint base URLs.
///
/// Buckets may contain duplicate endpoints (the validation service does not
/// guarantee uniqueness and deduplication would change random-selection
/// weighting); empty and absent buckets are equivalent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    buckets: HashMap<DirectoryKey, Vec<String>>,
}

impl Directory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an endpoint to a bucket, creating the bucket if needed.
    pub fn insert(&mut self, key: DirectoryKey, endpoint: impl Into<String>) {
        self.buckets.entry(key).or_default().push(endpoint.into());
    }

    /// Returns the bucket for a key, or `None` when absent.
    #[must_use]
    pub fn bucket(&self, key: &DirectoryKey) -> Option<&[String]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Total number of endpoint entries across all buckets.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    /// Consumes the directory, yielding its buckets.
    #[must_use]
    pub fn into_buckets(self) -> HashMap<DirectoryKey, Vec<String>> {
        self.buckets
    }

    /// Decodes the serialized wire format: a JSON object whose keys are
    /// two-character storage keys (e.g. `"a0"`) and whose values are arrays
    /// of endpoint URLs.
    ///
    /// Keys that do not decode to a [`DirectoryKey`] are skipped, not fatal:
    /// a newer sync process may publish categories this instance does not
    /// know yet.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::MalformedPayload`] if the payload is not a
    /// JSON object of string arrays.
    pub fn parse(raw: &str) -> Result<Self, DirectoryError> {
        let decoded: HashMap<String, Vec<String>> = serde_json::from_str(raw)?;

        let mut directory = Self::new();
        for (raw_key, endpoints) in decoded {
            match DirectoryKey::from_storage_key(&raw_key) {
                Some(key) => {
                    directory.buckets.entry(key).or_default().extend(endpoints);
                }
                None => {
                    debug!(key = %raw_key, "skipping unrecognized directory bucket");
                }
            }
        }

        Ok(directory)
    }

    /// Encodes the directory to its wire format. Buckets serialize in
    /// storage-key order so the payload is deterministic.
    #[must_use]
    pub fn to_json(&self) -> String {
        let ordered: BTreeMap<String, &Vec<String>> = self
            .buckets
            .iter()
            .map(|(key, endpoints)| (key.storage_key(), endpoints))
            .collect();

        serde_json::to_string(&ordered).unwrap_or_else(|_| "{}".to_string())
    }
}
