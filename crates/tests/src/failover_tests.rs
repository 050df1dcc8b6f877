//! Failover behavior: endpoint retries, region advancement, the static
//! fallback list, and outcome classification.

use http::StatusCode;
use meridian_core::{
    forward::{response::HANDLED_BY_HEADER, ForwardConfig},
    types::{ApiCategory, DirectoryKey, Region},
};

use crate::mock_infrastructure::{
    test_helpers::{get_request, payload},
    GatewayHarness, UpstreamMock,
};

fn chain_key(region: Region) -> DirectoryKey {
    DirectoryKey::new(ApiCategory::Chain, region)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_endpoint_triggers_region_failover() {
    // The preferred (Americas) endpoint answers 503; the retry must land on
    // the Europe bucket, the first region in the fixed failover order.
    let mut failing = UpstreamMock::start().await;
    let failing_mock = failing.mock_get("/v1/chain/get_info", 503, "{}").await;

    let mut healthy = UpstreamMock::start().await;
    let healthy_mock = healthy.mock_get("/v1/chain/get_info", 200, r#"{"ok":true}"#).await;

    let harness = GatewayHarness::with_payload(
        &payload(&[("a1", &[&failing.url()]), ("a0", &[&healthy.url()])]),
        ForwardConfig::default(),
    )
    .await;

    let response = harness
        .engine
        .forward(get_request("/v1/chain/get_info", Some("US")), ApiCategory::Chain)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[HANDLED_BY_HEADER].to_str().unwrap(), healthy.url());
    failing_mock.assert_async().await;
    healthy_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_endpoint_is_pruned_from_shared_cache() {
    let mut failing = UpstreamMock::start().await;
    failing.mock_get("/v1/chain/get_info", 502, "{}").await;

    let mut healthy = UpstreamMock::start().await;
    healthy.mock_get("/v1/chain/get_info", 200, "{}").await;

    let harness = GatewayHarness::with_payload(
        &payload(&[("a1", &[&failing.url()]), ("a0", &[&healthy.url()])]),
        ForwardConfig::default(),
    )
    .await;

    harness
        .engine
        .forward(get_request("/v1/chain/get_info", Some("US")), ApiCategory::Chain)
        .await;

    // The failed Americas endpoint is gone for every later request on this
    // instance; the Europe bucket is untouched.
    assert!(harness.cache.candidates(&chain_key(Region::Americas)).is_empty());
    assert_eq!(harness.cache.candidates(&chain_key(Region::Europe)), [healthy.url()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_same_endpoint_never_retried_within_one_request() {
    // A single always-failing endpoint with a budget of two attempts: the
    // endpoint must be called exactly once.
    let mut failing = UpstreamMock::start().await;
    let failing_mock = failing.mock_get_counted("/v1/chain/get_info", 503, "{}", 1).await;

    let harness = GatewayHarness::with_payload(
        &payload(&[("a0", &[&failing.url()])]),
        ForwardConfig::default(),
    )
    .await;

    let response = harness
        .engine
        .forward(get_request("/v1/chain/get_info", None), ApiCategory::Chain)
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    failing_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transport_failure_counts_as_retry() {
    // Nothing listens on port 1; the connection error must consume a retry
    // and fail over to the healthy endpoint.
    let mut healthy = UpstreamMock::start().await;
    let healthy_mock = healthy.mock_get("/v1/chain/get_info", 200, "{}").await;

    let harness = GatewayHarness::with_payload(
        &payload(&[("a1", &["http://127.0.0.1:1"]), ("a0", &[&healthy.url()])]),
        ForwardConfig::default(),
    )
    .await;

    let response = harness
        .engine
        .forward(get_request("/v1/chain/get_info", Some("US")), ApiCategory::Chain)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    healthy_mock.assert_async().await;
    assert!(harness.cache.candidates(&chain_key(Region::Americas)).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_forbidden_and_rate_limited_statuses_are_failures() {
    for status in [403, 429, 502, 503] {
        let mut disqualified = UpstreamMock::start().await;
        disqualified.mock_get("/v1/chain/get_info", status, "{}").await;

        let mut healthy = UpstreamMock::start().await;
        healthy.mock_get("/v1/chain/get_info", 200, r#"{"ok":true}"#).await;

        let harness = GatewayHarness::with_payload(
            &payload(&[("a1", &[&disqualified.url()]), ("a0", &[&healthy.url()])]),
            ForwardConfig::default(),
        )
        .await;

        let response = harness
            .engine
            .forward(get_request("/v1/chain/get_info", Some("US")), ApiCategory::Chain)
            .await;

        // The disqualifying status is never surfaced as a success.
        assert_eq!(response.status, StatusCode::OK, "upstream status {status}");
        assert_eq!(
            response.headers[HANDLED_BY_HEADER].to_str().unwrap(),
            healthy.url(),
            "upstream status {status}"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_regions_fall_back_to_static_list() {
    let mut fallback = UpstreamMock::start().await;
    let fallback_mock = fallback.mock_get("/v1/chain/get_info", 200, "{}").await;

    let config = ForwardConfig {
        fallback_endpoints: vec![fallback.url()],
        ..ForwardConfig::default()
    };
    let harness = GatewayHarness::with_payload("{}", config).await;

    let response = harness
        .engine
        .forward(get_request("/v1/chain/get_info", Some("US")), ApiCategory::Chain)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[HANDLED_BY_HEADER].to_str().unwrap(), fallback.url());
    fallback_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fallback_endpoints_are_never_pruned() {
    // Both fallback attempts fail; the fallback list is config data and
    // stays intact for the next request.
    let mut failing = UpstreamMock::start().await;
    let failing_mock = failing.mock_get_counted("/v1/chain/get_info", 503, "{}", 2).await;

    let config = ForwardConfig {
        fallback_endpoints: vec![failing.url(), failing.url()],
        ..ForwardConfig::default()
    };
    let harness = GatewayHarness::with_payload("{}", config).await;

    let response = harness
        .engine
        .forward(get_request("/v1/chain/get_info", None), ApiCategory::Chain)
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    failing_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exhaustion_with_no_candidates_returns_502_without_calls() {
    let harness = GatewayHarness::with_payload("{}", ForwardConfig::default()).await;

    let response = harness
        .engine
        .forward(get_request("/v1/chain/get_info", Some("JP")), ApiCategory::Wallet)
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["error"], "Bad Gateway");
    assert_eq!(body["statusCode"], 502);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retry_budget_bounds_attempts() {
    // Three failing endpoints in one bucket, budget of two: exactly two of
    // the three may be contacted.
    let mut failing = UpstreamMock::start().await;
    let failing_mock = failing.mock_get_counted("/v1/chain/get_info", 503, "{}", 2).await;

    let url = failing.url();
    let harness = GatewayHarness::with_payload(
        &payload(&[("a0", &[&url, &url, &url])]),
        ForwardConfig::default(),
    )
    .await;

    let response = harness
        .engine
        .forward(get_request("/v1/chain/get_info", None), ApiCategory::Chain)
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    failing_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_request_skips_pruned_endpoint() {
    let mut failing = UpstreamMock::start().await;
    let failing_mock = failing.mock_get_counted("/v1/chain/get_info", 503, "{}", 1).await;

    let mut healthy = UpstreamMock::start().await;
    let healthy_mock = healthy.mock_get_counted("/v1/chain/get_info", 200, "{}", 2).await;

    let harness = GatewayHarness::with_payload(
        &payload(&[("a1", &[&failing.url()]), ("a0", &[&healthy.url()])]),
        ForwardConfig::default(),
    )
    .await;

    // First request: fails over from Americas to Europe.
    let first = harness
        .engine
        .forward(get_request("/v1/chain/get_info", Some("US")), ApiCategory::Chain)
        .await;
    assert_eq!(first.status, StatusCode::OK);

    // Second request: the failed endpoint is pruned, so the Europe endpoint
    // serves directly without touching the failing one again.
    let second = harness
        .engine
        .forward(get_request("/v1/chain/get_info", Some("US")), ApiCategory::Chain)
        .await;
    assert_eq!(second.status, StatusCode::OK);

    failing_mock.assert_async().await;
    healthy_mock.assert_async().await;
}
