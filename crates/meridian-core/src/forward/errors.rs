//! Failure classification for upstream calls.
//!
//! Every attempt outcome is an explicit `Result`: the retry loop inspects a
//! tagged value instead of catching exceptions mid-flight. Transport
//! failures and disqualifying protocol statuses are deliberately the same
//! type: both consume a retry and prune the endpoint.

use http::StatusCode;
use thiserror::Error;

/// Errors from a single upstream attempt.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The upstream did not answer within the configured timeout.
    #[error("request timeout")]
    Timeout,

    /// Network-level failure (DNS, refused connection, broken body).
    /// The message is sanitized before it reaches logs.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The upstream answered, but with a status the gateway treats as a
    /// failure (403, 429, or >= 502).
    #[error("disqualifying upstream status: {0}")]
    DisqualifyingStatus(u16),

    /// The directory handed out an endpoint that is not a valid base URL.
    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(String),
}

impl UpstreamError {
    /// Classifies a reqwest error, sanitizing the message so no connection
    /// detail leaks past the log boundary.
    #[must_use]
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }

        let detail = if error.is_connect() {
            "connection refused or unreachable"
        } else if error.is_request() {
            "request failed"
        } else if error.is_body() {
            "response body error"
        } else if error.is_decode() {
            "response decode error"
        } else if error.is_redirect() {
            "too many redirects"
        } else {
            "network error"
        };

        Self::ConnectionFailed(detail.to_string())
    }
}

/// Returns `true` when a received status must be treated as an upstream
/// failure: 403, 429, or any status of 502 and above.
#[must_use]
pub fn is_disqualifying_status(status: StatusCode) -> bool {
    let code = status.as_u16();
    code == 403 || code == 429 || code >= 502
}
