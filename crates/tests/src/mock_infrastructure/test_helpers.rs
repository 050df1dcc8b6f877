//! Shared wiring for gateway integration tests.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};
use meridian_core::{
    directory::{
        cache::{DirectoryCache, DirectoryCacheConfig},
        store::{DirectoryStore, MemoryStore},
        DIRECTORY_STORE_KEY,
    },
    forward::{ForwardConfig, ForwardEngine, GatewayRequest},
    region::CountryRegionTable,
};

/// A forwarding engine wired to an in-memory store, with handles to every
/// layer so tests can observe shared state.
pub struct GatewayHarness {
    pub engine: Arc<ForwardEngine>,
    pub cache: DirectoryCache,
    pub store: Arc<MemoryStore>,
}

impl GatewayHarness {
    /// Builds a harness with the given published directory payload.
    pub async fn with_payload(payload: &str, forward_config: ForwardConfig) -> Self {
        Self::with_configs(Some(payload), forward_config, DirectoryCacheConfig::default()).await
    }

    /// Builds a harness with full control over cache staleness thresholds.
    pub async fn with_configs(
        payload: Option<&str>,
        forward_config: ForwardConfig,
        cache_config: DirectoryCacheConfig,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        if let Some(payload) = payload {
            store.put(DIRECTORY_STORE_KEY, payload).await.expect("memory store put");
        }

        let cache = DirectoryCache::new(store.clone(), cache_config);
        let engine = Arc::new(
            ForwardEngine::new(
                cache.clone(),
                Arc::new(CountryRegionTable::standard()),
                forward_config,
            )
            .expect("engine builds"),
        );

        Self { engine, cache, store }
    }

    /// Replaces the published directory payload in the backing store.
    pub async fn publish(&self, payload: &str) {
        self.store.put(DIRECTORY_STORE_KEY, payload).await.expect("memory store put");
    }
}

/// Serializes bucket definitions into the directory wire format, e.g.
/// `payload(&[("a1", &[url])])`.
#[must_use]
pub fn payload(buckets: &[(&str, &[&str])]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = buckets
        .iter()
        .map(|(key, endpoints)| {
            let urls: Vec<serde_json::Value> =
                endpoints.iter().map(|url| (*url).into()).collect();
            ((*key).to_string(), serde_json::Value::Array(urls))
        })
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// A GET request with an optional country signal.
#[must_use]
pub fn get_request(path: &str, country: Option<&str>) -> GatewayRequest {
    GatewayRequest {
        method: Method::GET,
        path: path.to_string(),
        query: None,
        country: country.map(str::to_string),
        headers: HeaderMap::new(),
        body: Bytes::new(),
    }
}

/// A POST request with a JSON body and an optional country signal.
#[must_use]
pub fn post_request(path: &str, body: &str, country: Option<&str>) -> GatewayRequest {
    GatewayRequest {
        method: Method::POST,
        path: path.to_string(),
        query: None,
        country: country.map(str::to_string),
        headers: HeaderMap::new(),
        body: Bytes::from(body.to_string()),
    }
}
