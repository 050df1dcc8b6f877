//! The sync engine: one run queries the validation service once per API
//! category, buckets the returned endpoints by region, and publishes the
//! merged directory as a single atomic replacement of the store's `all`
//! entry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::{SyncError, ValidationClient};
use crate::{
    directory::{store::DirectoryStore, Directory, DIRECTORY_STORE_KEY},
    region::CountryRegionTable,
    types::{ApiCategory, DirectoryKey},
};

/// Rebuilds and republishes the endpoint directory.
pub struct SyncEngine {
    client: ValidationClient,
    store: Arc<dyn DirectoryStore>,
    regions: Arc<CountryRegionTable>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        client: ValidationClient,
        store: Arc<dyn DirectoryStore>,
        regions: Arc<CountryRegionTable>,
    ) -> Self {
        Self { client, store, regions }
    }

    /// Executes one sync run.
    ///
    /// Each category is fetched independently: a failed or empty category is
    /// logged and skipped, the other categories still publish. The merged
    /// directory replaces the store's `all` entry in one write.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Publish`] only when the final store write fails.
    /// The run is not retried; the next scheduled run covers it.
    pub async fn run(&self) -> Result<(), SyncError> {
        let mut directory = Directory::new();

        for category in ApiCategory::ALL {
            match self.client.fetch_category(category).await {
                Ok(Some(records)) => {
                    let count = records.len();
                    self.merge_category(&mut directory, category, records);
                    info!(%category, endpoints = count, "merged category");
                }
                Ok(None) => {
                    info!(%category, "no validated endpoints for category");
                }
                Err(e) => {
                    warn!(%category, error = %e, "validation fetch failed, skipping category");
                }
            }
        }

        let payload = directory.to_json();
        self.store.put(DIRECTORY_STORE_KEY, &payload).await?;
        info!(endpoints = directory.endpoint_count(), "published directory snapshot");

        Ok(())
    }

    /// Buckets one category's endpoint → country records by region.
    /// Duplicates from the source are kept as-is.
    fn merge_category(
        &self,
        directory: &mut Directory,
        category: ApiCategory,
        records: HashMap<String, String>,
    ) {
        for (endpoint, country_code) in records {
            let region = self.regions.resolve(&country_code);
            directory.insert(DirectoryKey::new(category, region), endpoint);
        }
    }
}
