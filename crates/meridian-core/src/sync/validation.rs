//! Client for the external health-validation service.
//!
//! One POST per API category. The service considers every validation run
//! inside the configured time window; an endpoint is returned only when all
//! of them passed, so the gateway never needs to health-check locally.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::SyncError;
use crate::types::ApiCategory;

/// Connection settings for the validation service.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Endpoint of the private validation API.
    pub url: String,
    /// Token identifying this deployment to the validation API.
    pub auth_token: String,
    /// Validation window in milliseconds: all validations between `now()`
    /// and `now() - time_offset_ms` must have passed.
    pub time_offset_ms: u64,
    /// Request endpoints validated against mainnet (`true`) or testnet.
    pub mainnet: bool,
    /// Restrict results to TLS-terminated endpoints.
    pub ssl_only: bool,
    /// Per-fetch request timeout.
    pub request_timeout: Duration,
}

#[derive(Serialize)]
struct ValidationQuery<'a> {
    #[serde(rename = "auth-token")]
    auth_token: &'a str,
    #[serde(rename = "time-offset-ms")]
    time_offset_ms: u64,
    #[serde(rename = "api-type")]
    api_type: &'a str,
    #[serde(rename = "is-mainnet")]
    is_mainnet: bool,
    #[serde(rename = "is-ssl")]
    is_ssl: bool,
}

/// Validation-service client; one per sync process.
pub struct ValidationClient {
    client: reqwest::Client,
    config: ValidationConfig,
}

impl ValidationClient {
    /// Creates a client for the configured validation service.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Unreachable`] if the underlying HTTP client
    /// fails to build.
    pub fn new(config: ValidationConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.request_timeout)
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("meridian-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetches the healthy endpoints for one category.
    ///
    /// Returns `Ok(Some(map))` with endpoint → country code on success and
    /// `Ok(None)` when the service reports no data (HTTP 404).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] for network failures, non-404 error statuses,
    /// and malformed payloads. Callers treat these as "no data for this
    /// category" after logging.
    pub async fn fetch_category(
        &self,
        category: ApiCategory,
    ) -> Result<Option<HashMap<String, String>>, SyncError> {
        let query = ValidationQuery {
            auth_token: &self.config.auth_token,
            time_offset_ms: self.config.time_offset_ms,
            api_type: category.wire_name(),
            is_mainnet: self.config.mainnet,
            is_ssl: self.config.ssl_only,
        };

        let response = self.client.post(&self.config.url).json(&query).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(%category, "validation service has no data");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SyncError::BadStatus(status.as_u16()));
        }

        let raw = response.text().await?;
        let records: HashMap<String, String> = serde_json::from_str(&raw)?;
        debug!(%category, endpoints = records.len(), "validation service responded");
        Ok(Some(records))
    }
}
