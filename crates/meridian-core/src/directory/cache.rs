//! Per-instance directory cache with a staleness-tolerant refresh policy.
//!
//! The cache holds one [`Directory`] snapshot shared by every concurrent
//! forwarding task. Whole-snapshot replacement goes through a single
//! `ArcSwap` pointer swap so readers never observe a half-written snapshot;
//! single-endpoint removal mutates one bucket of the current snapshot under
//! that bucket's `DashMap` shard guard.
//!
//! Refresh policy, evaluated at the start of every forwarding attempt:
//!
//! - never populated, empty, or older than the hard TTL: synchronous
//!   refresh, the request blocks until the new snapshot is installed;
//! - older than the soft TTL: serve the stale snapshot, trigger a
//!   fire-and-forget background refresh for future requests;
//! - otherwise: serve as is.
//!
//! A failed fetch or parse always leaves the previous snapshot in place.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    store::{DirectoryStore, StoreError},
    Directory, DirectoryError, DIRECTORY_STORE_KEY,
};
use crate::types::DirectoryKey;

/// Staleness thresholds for the cached snapshot.
#[derive(Debug, Clone)]
pub struct DirectoryCacheConfig {
    /// Age beyond which a background refresh is triggered while the stale
    /// snapshot keeps serving.
    pub soft_ttl: Duration,
    /// Age beyond which requests block on a synchronous refresh. Bounds
    /// worst-case staleness.
    pub hard_ttl: Duration,
}

impl Default for DirectoryCacheConfig {
    fn default() -> Self {
        Self { soft_ttl: Duration::from_secs(60), hard_ttl: Duration::from_secs(600) }
    }
}

/// Errors from a single refresh attempt. Callers on the request path log
/// these and proceed with whatever snapshot is installed.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Payload(#[from] DirectoryError),

    /// The store has no published directory yet.
    #[error("directory store has no published snapshot")]
    NotPublished,
}

struct Snapshot {
    buckets: DashMap<DirectoryKey, Vec<String>>,
    fetched_at: Instant,
    populated: bool,
}

impl Snapshot {
    fn empty() -> Self {
        Self { buckets: DashMap::new(), fetched_at: Instant::now(), populated: false }
    }

    fn from_directory(directory: Directory) -> Self {
        let buckets = DashMap::new();
        for (key, endpoints) in directory.into_buckets() {
            buckets.insert(key, endpoints);
        }
        Self { buckets, fetched_at: Instant::now(), populated: true }
    }
}

struct CacheInner {
    snapshot: ArcSwap<Snapshot>,
    store: Arc<dyn DirectoryStore>,
    config: DirectoryCacheConfig,
    refresh_in_flight: AtomicBool,
}

/// Shared, staleness-tolerant view of the endpoint directory.
///
/// Cloning is cheap and yields a handle to the same snapshot; one cache is
/// shared by every request task of an instance.
#[derive(Clone)]
pub struct DirectoryCache {
    inner: Arc<CacheInner>,
}

impl DirectoryCache {
    /// Creates an empty cache backed by the given store. The first request
    /// will populate it synchronously.
    #[must_use]
    pub fn new(store: Arc<dyn DirectoryStore>, config: DirectoryCacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                snapshot: ArcSwap::from_pointee(Snapshot::empty()),
                store,
                config,
                refresh_in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// Applies the refresh policy for one forwarding attempt.
    ///
    /// Blocks the caller only on the hard path (no usable snapshot, or past
    /// the hard TTL). Refresh failures are logged and swallowed: the request
    /// proceeds with the previous (possibly empty) snapshot, and exhaustion
    /// downstream surfaces as 502.
    pub async fn ensure_fresh(&self) {
        let (needs_sync, needs_background) = {
            let snapshot = self.inner.snapshot.load();
            let age = snapshot.fetched_at.elapsed();

            let needs_sync = !snapshot.populated ||
                snapshot.buckets.is_empty() ||
                age > self.inner.config.hard_ttl;
            (needs_sync, age > self.inner.config.soft_ttl)
        };

        if needs_sync {
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "synchronous directory refresh failed, serving stale snapshot");
            }
        } else if needs_background {
            self.spawn_background_refresh();
        }
    }

    /// Fetches the published directory from the store and installs it.
    ///
    /// The previous snapshot is retained on any failure: a malformed or
    /// missing payload never clears a working directory.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] when the store read fails, the store holds
    /// no snapshot, or the payload does not parse.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let raw = self
            .inner
            .store
            .get(DIRECTORY_STORE_KEY)
            .await?
            .ok_or(RefreshError::NotPublished)?;

        let directory = Directory::parse(&raw)?;
        let endpoint_count = directory.endpoint_count();
        self.install(directory);

        debug!(endpoints = endpoint_count, "directory snapshot installed");
        Ok(())
    }

    /// Installs a directory as the current snapshot, resetting its age.
    pub fn install(&self, directory: Directory) {
        self.inner.snapshot.store(Arc::new(Snapshot::from_directory(directory)));
    }

    /// Triggers a fire-and-forget refresh unless one is already running.
    /// The triggering request is never blocked; errors are logged inside
    /// the task and leave the old snapshot serving.
    fn spawn_background_refresh(&self) {
        if self
            .inner
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let cache = self.clone();
        tokio::spawn(async move {
            match cache.refresh().await {
                Ok(()) => info!("background directory refresh completed"),
                Err(e) => warn!(error = %e, "background directory refresh failed"),
            }
            cache.inner.refresh_in_flight.store(false, Ordering::Release);
        });
    }

    /// Returns a request-local working copy of a bucket's candidates.
    /// Absent and empty buckets both yield an empty list.
    #[must_use]
    pub fn candidates(&self, key: &DirectoryKey) -> Vec<String> {
        self.inner
            .snapshot
            .load()
            .buckets
            .get(key)
            .map(|bucket| bucket.value().clone())
            .unwrap_or_default()
    }

    /// Removes the first occurrence of a failed endpoint from the shared
    /// bucket, so subsequent requests on this instance skip it until the
    /// next refresh republishes it.
    pub fn remove_endpoint(&self, key: &DirectoryKey, endpoint: &str) {
        let snapshot = self.inner.snapshot.load();
        let mut maybe_bucket = snapshot.buckets.get_mut(key);
        if let Some(bucket) = maybe_bucket.as_mut() {
            if let Some(index) = bucket.iter().position(|candidate| candidate == endpoint) {
                bucket.remove(index);
                info!(%key, endpoint, "removed failed endpoint from directory cache");
            }
        }
    }

    /// Age of the current snapshot, or `None` if never populated.
    #[must_use]
    pub fn age(&self) -> Option<Duration> {
        let snapshot = self.inner.snapshot.load();
        snapshot.populated.then(|| snapshot.fetched_at.elapsed())
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.inner.snapshot.load().populated
    }
}
