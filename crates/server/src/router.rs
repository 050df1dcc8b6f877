use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use meridian_core::{
    forward::{response, ForwardEngine, GatewayRequest},
    routes::{RouteClass, RouteTable},
};
use tracing::debug;

/// Request bodies above this size are rejected by the body-limit layer
/// before they reach the handler.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state handed to every request task.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<ForwardEngine>,
    pub routes: Arc<RouteTable>,
    /// Header carrying the client's country code, set by the fronting edge.
    pub country_header: HeaderName,
}

/// Catch-all handler: classifies the path and either answers directly
/// (404 / 403) or hands the request to the forwarding engine.
pub async fn handle_gateway(State(state): State<GatewayState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let category = match state.routes.classify(&path) {
        RouteClass::Forward(category) => category,
        RouteClass::Disabled => {
            debug!(method = %parts.method, path = %path, "rejected disabled route");
            return to_response(response::route_disabled(&parts.method, &path));
        }
        RouteClass::Unknown => {
            debug!(method = %parts.method, path = %path, "rejected unknown route");
            return to_response(response::route_not_found(&parts.method, &path));
        }
    };

    let body_bytes = read_body(body).await;
    let country = parts
        .headers
        .get(&state.country_header)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let gateway_request = GatewayRequest {
        method: parts.method,
        path,
        query: parts.uri.query().map(str::to_string),
        country,
        headers: parts.headers,
        body: body_bytes,
    };

    to_response(state.engine.forward(gateway_request, category).await)
}

/// Local liveness endpoint; reports whether a directory snapshot is loaded.
/// Not part of the forwarded API surface.
pub async fn handle_health(State(state): State<GatewayState>) -> impl IntoResponse {
    let cache = state.engine.directory_cache();
    let populated = cache.is_populated();

    let health = serde_json::json!({
        "status": if populated { "healthy" } else { "starting" },
        "directory": {
            "populated": populated,
            "age_seconds": cache.age().map(|age| age.as_secs()),
        },
    });

    (
        if populated { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE },
        [("content-type", "application/json")],
        health.to_string(),
    )
}

/// Drains the request body. An unreadable body is treated as empty: harmless
/// for GET/HEAD, and body-bearing requests then fail JSON validation with
/// the standardized 400.
async fn read_body(body: Body) -> Bytes {
    axum::body::to_bytes(body, MAX_BODY_BYTES).await.unwrap_or_default()
}

fn to_response(gateway_response: meridian_core::forward::GatewayResponse) -> Response {
    (gateway_response.status, gateway_response.headers, gateway_response.body).into_response()
}
