//! Sync-engine runs against a mock validation service, including the
//! published snapshot feeding a live gateway.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use meridian_core::{
    directory::{
        cache::{DirectoryCache, DirectoryCacheConfig},
        store::{DirectoryStore, MemoryStore},
        Directory, DIRECTORY_STORE_KEY,
    },
    forward::{response::HANDLED_BY_HEADER, ForwardConfig, ForwardEngine},
    region::CountryRegionTable,
    sync::{SyncEngine, ValidationClient, ValidationConfig},
    types::{ApiCategory, DirectoryKey, Region},
};

use crate::mock_infrastructure::{
    test_helpers::get_request,
    UpstreamMock, ValidationMock,
};

fn validation_client(url: String) -> ValidationClient {
    ValidationClient::new(ValidationConfig {
        url,
        auth_token: "integration-token".to_string(),
        time_offset_ms: 1_800_000,
        mainnet: true,
        ssl_only: false,
        request_timeout: Duration::from_secs(5),
    })
    .expect("validation client builds")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_run_publishes_all_categories() {
    let mut validation = ValidationMock::start().await;
    validation
        .mock_category("chain", &[("http://a.example:8080", "US"), ("http://b.example:8080", "DE")])
        .await;
    validation.mock_category("history", &[("http://h.example:8080", "JP")]).await;
    validation.mock_category("analytics", &[("http://y.example:8080", "BR")]).await;
    validation.mock_category("wallet", &[("http://w.example:8080", "FR")]).await;

    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(
        validation_client(validation.url()),
        store.clone(),
        Arc::new(CountryRegionTable::standard()),
    );

    engine.run().await.unwrap();

    let published = store.get(DIRECTORY_STORE_KEY).await.unwrap().unwrap();
    let directory = Directory::parse(&published).unwrap();

    assert_eq!(
        directory.bucket(&DirectoryKey::new(ApiCategory::Chain, Region::Americas)).unwrap(),
        ["http://a.example:8080"]
    );
    assert_eq!(
        directory.bucket(&DirectoryKey::new(ApiCategory::Chain, Region::Europe)).unwrap(),
        ["http://b.example:8080"]
    );
    assert_eq!(
        directory.bucket(&DirectoryKey::new(ApiCategory::History, Region::Asia)).unwrap(),
        ["http://h.example:8080"]
    );
    assert_eq!(
        directory.bucket(&DirectoryKey::new(ApiCategory::Analytics, Region::Americas)).unwrap(),
        ["http://y.example:8080"]
    );
    assert_eq!(
        directory.bucket(&DirectoryKey::new(ApiCategory::Wallet, Region::Europe)).unwrap(),
        ["http://w.example:8080"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_tolerates_partial_failures() {
    let mut validation = ValidationMock::start().await;
    validation.mock_category_error("chain", 500).await;
    validation.mock_category_not_found("history").await;
    validation.mock_category_not_found("analytics").await;
    validation.mock_category("wallet", &[("http://w.example:8080", "SG")]).await;

    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(
        validation_client(validation.url()),
        store.clone(),
        Arc::new(CountryRegionTable::standard()),
    );

    engine.run().await.unwrap();

    let published = store.get(DIRECTORY_STORE_KEY).await.unwrap().unwrap();
    let directory = Directory::parse(&published).unwrap();

    assert_eq!(directory.endpoint_count(), 1);
    assert_eq!(
        directory.bucket(&DirectoryKey::new(ApiCategory::Wallet, Region::Asia)).unwrap(),
        ["http://w.example:8080"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_published_snapshot_feeds_the_gateway() {
    // Full loop: validation service -> sync engine -> shared store ->
    // directory cache -> forwarded request.
    let mut upstream = UpstreamMock::start().await;
    let upstream_mock = upstream.mock_get("/v1/chain/get_info", 200, r#"{"ok":true}"#).await;

    let mut validation = ValidationMock::start().await;
    validation.mock_category("chain", &[(upstream.url().as_str(), "US")]).await;
    validation.mock_category_not_found("history").await;
    validation.mock_category_not_found("analytics").await;
    validation.mock_category_not_found("wallet").await;

    let store = Arc::new(MemoryStore::new());
    let sync_engine = SyncEngine::new(
        validation_client(validation.url()),
        store.clone(),
        Arc::new(CountryRegionTable::standard()),
    );
    sync_engine.run().await.unwrap();

    let cache = DirectoryCache::new(store, DirectoryCacheConfig::default());
    let forward_engine = Arc::new(
        ForwardEngine::new(
            cache,
            Arc::new(CountryRegionTable::standard()),
            ForwardConfig::default(),
        )
        .expect("engine builds"),
    );

    let response = forward_engine
        .forward(get_request("/v1/chain/get_info", Some("US")), ApiCategory::Chain)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[HANDLED_BY_HEADER].to_str().unwrap(), upstream.url());
    upstream_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_run_replaces_previous_snapshot() {
    let mut validation = ValidationMock::start().await;
    validation.mock_all_not_found().await;

    let store = Arc::new(MemoryStore::new());
    store
        .put(DIRECTORY_STORE_KEY, r#"{"a0":["http://stale.example:8080"]}"#)
        .await
        .unwrap();

    let engine = SyncEngine::new(
        validation_client(validation.url()),
        store.clone(),
        Arc::new(CountryRegionTable::standard()),
    );
    engine.run().await.unwrap();

    let published = store.get(DIRECTORY_STORE_KEY).await.unwrap().unwrap();
    assert_eq!(published, "{}");
}
