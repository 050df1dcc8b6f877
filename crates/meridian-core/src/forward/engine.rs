//! The forwarding engine: region-aware endpoint selection with bounded,
//! failure-pruning retries.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use rand::Rng;
use tracing::{debug, warn};

use super::{
    errors::{is_disqualifying_status, UpstreamError},
    response::{self, GatewayRequest, GatewayResponse, HANDLED_BY_HEADER},
};
use crate::{
    directory::cache::DirectoryCache,
    region::CountryRegionTable,
    types::{ApiCategory, DirectoryKey, Region},
};

/// Forwarding behavior knobs. The defaults match the deployed gateway: a
/// 2-second upstream budget and two attempts against different endpoints.
#[derive(Debug, Clone)]
pub struct ForwardConfig {
    /// Per-attempt upstream timeout. A timeout consumes a retry.
    pub upstream_timeout: Duration,
    /// Maximum number of attempts, each against a different endpoint.
    pub max_retries: u32,
    /// Last-resort endpoints used only once every region is exhausted.
    /// May be empty, in which case exhaustion yields 502.
    pub fallback_endpoints: Vec<String>,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_millis(2000),
            max_retries: 2,
            fallback_endpoints: Vec::new(),
        }
    }
}

/// Forwards classified requests to geography-matched upstream endpoints,
/// failing over across endpoints, regions, and the static fallback list.
///
/// Thread-safe: one engine is shared by every request task. The only shared
/// mutable state is the [`DirectoryCache`], which handles its own
/// synchronization.
pub struct ForwardEngine {
    client: reqwest::Client,
    cache: DirectoryCache,
    regions: Arc<CountryRegionTable>,
    config: ForwardConfig,
}

impl ForwardEngine {
    /// Creates an engine with a pooled HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::ConnectionFailed`] if the underlying reqwest
    /// client fails to build.
    pub fn new(
        cache: DirectoryCache,
        regions: Arc<CountryRegionTable>,
        config: ForwardConfig,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(32)
            .connect_timeout(Duration::from_secs(5))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("meridian/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                UpstreamError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self { client, cache, regions, config })
    }

    /// Forwards a classified request, returning either the upstream response
    /// (annotated with the serving endpoint) or a standardized error body.
    ///
    /// Never panics and never surfaces internal errors: every failure path
    /// normalizes to one of the fixed JSON shapes.
    pub async fn forward(
        &self,
        request: GatewayRequest,
        category: ApiCategory,
    ) -> GatewayResponse {
        let has_body = request.has_body();
        if has_body && serde_json::from_slice::<serde_json::Value>(&request.body).is_err() {
            return response::invalid_json();
        }

        let preferred = self.regions.resolve(request.country.as_deref().unwrap_or(""));
        let mut remaining_regions: VecDeque<Region> =
            Region::ALL.iter().copied().filter(|region| *region != preferred).collect();

        self.cache.ensure_fresh().await;

        let mut current_region = preferred;
        let mut working = self.cache.candidates(&DirectoryKey::new(category, current_region));
        let mut on_fallback = false;

        debug!(
            %category,
            region = %current_region,
            candidates = working.len(),
            "forwarding request"
        );

        for attempt in 0..self.config.max_retries {
            // Advance through regions in fixed order, then the static
            // fallback list, until candidates exist. The fallback list is
            // entered at most once per request.
            while working.is_empty() {
                if let Some(next) = remaining_regions.pop_front() {
                    current_region = next;
                    working =
                        self.cache.candidates(&DirectoryKey::new(category, current_region));
                } else if !on_fallback {
                    on_fallback = true;
                    working = self.config.fallback_endpoints.clone();
                } else {
                    return response::no_server_available();
                }
            }

            // Uniform random pick from the request-local working copy; the
            // removal here only prevents this request from retrying the same
            // endpoint.
            let index = rand::thread_rng().gen_range(0..working.len());
            let endpoint = working.swap_remove(index);

            match self.try_endpoint(&endpoint, &request, has_body).await {
                Ok(upstream_response) => {
                    debug!(
                        attempt,
                        endpoint = %endpoint,
                        status = %upstream_response.status,
                        "upstream call succeeded"
                    );
                    return annotate_success(upstream_response, &endpoint);
                }
                Err(error) => {
                    warn!(attempt, endpoint = %endpoint, error = %error, "upstream call failed");
                    // Prune the endpoint from the shared bucket so other
                    // requests on this instance skip it too. Fallback
                    // endpoints are static and never pruned.
                    if !on_fallback {
                        self.cache.remove_endpoint(
                            &DirectoryKey::new(category, current_region),
                            &endpoint,
                        );
                    }
                }
            }
        }

        response::no_server_available()
    }

    /// Issues one upstream call, classifying the outcome as an explicit
    /// result: a qualifying response, or an [`UpstreamError`] the retry loop
    /// acts on.
    async fn try_endpoint(
        &self,
        endpoint: &str,
        request: &GatewayRequest,
        has_body: bool,
    ) -> Result<GatewayResponse, UpstreamError> {
        let url = build_upstream_url(endpoint, &request.path, request.query.as_deref())?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(forwardable_headers(&request.headers))
            .timeout(self.config.upstream_timeout);
        if has_body {
            builder = builder.body(request.body.clone());
        }

        let upstream = builder.send().await.map_err(|e| UpstreamError::from_reqwest(&e))?;

        let status = upstream.status();
        if is_disqualifying_status(status) {
            return Err(UpstreamError::DisqualifyingStatus(status.as_u16()));
        }

        // Hop-by-hop headers describe the upstream connection, not the
        // buffered body handed back to the client.
        let mut headers = upstream.headers().clone();
        headers.remove(header::TRANSFER_ENCODING);
        headers.remove(header::CONNECTION);

        let body: Bytes = upstream.bytes().await.map_err(|e| UpstreamError::from_reqwest(&e))?;

        Ok(GatewayResponse { status, headers, body })
    }

    /// Read access to the directory cache, for the hosting binary's health
    /// reporting.
    #[must_use]
    pub fn directory_cache(&self) -> &DirectoryCache {
        &self.cache
    }
}

/// Joins the endpoint base URL with the request path, preserving the query
/// string.
fn build_upstream_url(
    endpoint: &str,
    path: &str,
    query: Option<&str>,
) -> Result<url::Url, UpstreamError> {
    let base = url::Url::parse(endpoint)
        .map_err(|e| UpstreamError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
    let mut url = base
        .join(path)
        .map_err(|e| UpstreamError::InvalidEndpoint(format!("{endpoint}{path}: {e}")))?;
    url.set_query(query);
    Ok(url)
}

/// Copies the client's headers for the upstream call, dropping hop-by-hop
/// headers the HTTP client manages itself.
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == header::HOST ||
            name == header::CONTENT_LENGTH ||
            name == header::CONNECTION ||
            name == header::TRANSFER_ENCODING
        {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

/// Annotates a forwarded response with the serving endpoint and permissive
/// CORS before it goes back to the client.
fn annotate_success(mut response: GatewayResponse, endpoint: &str) -> GatewayResponse {
    if let Ok(value) = HeaderValue::from_str(endpoint) {
        response.headers.insert(HANDLED_BY_HEADER, value);
    }
    response
        .headers
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}
