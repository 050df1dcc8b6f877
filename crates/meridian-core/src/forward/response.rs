//! Host-runtime-agnostic request/response types and the standardized JSON
//! error bodies.
//!
//! Every client-visible failure is normalized to one of four shapes
//! (404 / 403 / 400 / 502) carrying the fixed service header set. Raw error
//! detail never leaves the logs.

use bytes::Bytes;
use http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, StatusCode,
};

/// Header naming the upstream endpoint that served a forwarded response.
pub const HANDLED_BY_HEADER: HeaderName = HeaderName::from_static("x-request-handled-by");

/// Header identifying the gateway on responses it answered itself.
pub const REJECTED_BY_HEADER: HeaderName = HeaderName::from_static("x-rejected-by");

const SERVICE_NAME: &str = "meridian";
const SERVICE_IDENT: &str = concat!("meridian/", env!("CARGO_PKG_VERSION"));

/// An inbound request as seen by the forwarding engine, independent of the
/// hosting HTTP runtime.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    /// Request path, e.g. `/v1/chain/get_info`.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    /// Country-of-origin signal supplied by the fronting edge.
    pub country: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayRequest {
    /// Whether the method carries a body that must parse as JSON before the
    /// request may be forwarded.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.method != Method::GET && self.method != Method::HEAD
    }
}

/// A response handed back to the hosting HTTP runtime: either the forwarded
/// upstream response or one of the standardized error bodies.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The fixed header set carried by every gateway-answered response:
/// service identity and permissive CORS.
fn service_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::SERVER, HeaderValue::from_static(SERVICE_IDENT));
    headers.insert(REJECTED_BY_HEADER, HeaderValue::from_static(SERVICE_NAME));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Origin, X-Requested-With, Content-Type, Accept"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers
}

fn error_response(status: StatusCode, message: &str, error: &str) -> GatewayResponse {
    let body = serde_json::json!({
        "message": message,
        "error": error,
        "statusCode": status.as_u16(),
    });

    GatewayResponse {
        status,
        headers: service_headers(),
        body: Bytes::from(body.to_string()),
    }
}

/// 404 for paths that are neither routed nor explicitly disabled.
#[must_use]
pub fn route_not_found(method: &Method, path: &str) -> GatewayResponse {
    error_response(
        StatusCode::NOT_FOUND,
        &format!("Route {method}:{path} not found"),
        "Not Found",
    )
}

/// 403 for paths under a disabled prefix. Some upstreams may support them,
/// but the gateway never forwards them.
#[must_use]
pub fn route_disabled(method: &Method, path: &str) -> GatewayResponse {
    error_response(
        StatusCode::FORBIDDEN,
        &format!("Route {method}:{path} is disabled"),
        "Forbidden",
    )
}

/// 400 for body-bearing requests whose body does not parse as JSON.
#[must_use]
pub fn invalid_json() -> GatewayResponse {
    error_response(StatusCode::BAD_REQUEST, "INVALID_JSON", "Bad Request")
}

/// 502 once the retry budget is exhausted, or when no candidate endpoints
/// exist anywhere.
#[must_use]
pub fn no_server_available() -> GatewayResponse {
    error_response(
        StatusCode::BAD_GATEWAY,
        "The gateway did not receive a valid reply from any upstream API endpoint.",
        "Bad Gateway",
    )
}
