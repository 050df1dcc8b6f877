//! Application configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `MERIDIAN_CONFIG` env var
//! 3. **Environment variables**: `MERIDIAN_*` env vars override fields
//!
//! Configuration is validated at load time; invalid values (zero retry
//! budget, malformed fallback URLs) return errors instead of failing
//! silently at request time.
//!
//! # Example
//!
//! ```toml
//! environment = "production"
//!
//! [server]
//! bind_address = "0.0.0.0"
//! bind_port = 8080
//!
//! [gateway]
//! upstream_timeout_ms = 2000
//! max_retries = 2
//! fallback_endpoints = ["https://fallback.example"]
//!
//! [sync]
//! validation_url = "https://validation.example/api"
//! auth_token = "SECRET"
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::{
    directory::cache::DirectoryCacheConfig,
    forward::ForwardConfig,
    sync::ValidationConfig,
};

/// HTTP server settings for the gateway binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `8080`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum number of concurrently handled requests. Defaults to `1000`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_max_concurrent_requests() -> usize {
    1000
}

/// Forwarding and directory-refresh behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Per-attempt upstream timeout in milliseconds. Defaults to `2000`.
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    /// Retry budget: attempts per request, each against a different
    /// endpoint. Defaults to `2`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Last-resort endpoints used once every region is exhausted. Defaults
    /// to empty.
    #[serde(default)]
    pub fallback_endpoints: Vec<String>,

    /// Snapshot age in seconds past which a background refresh is
    /// triggered. Defaults to `60`.
    #[serde(default = "default_soft_refresh_seconds")]
    pub soft_refresh_seconds: u64,

    /// Snapshot age in seconds past which requests block on a synchronous
    /// refresh. Defaults to `600`.
    #[serde(default = "default_hard_refresh_seconds")]
    pub hard_refresh_seconds: u64,

    /// Header carrying the client's country code, set by the fronting edge.
    /// Defaults to `x-client-country`.
    #[serde(default = "default_country_header")]
    pub country_header: String,
}

fn default_upstream_timeout_ms() -> u64 {
    2000
}

fn default_max_retries() -> u32 {
    2
}

fn default_soft_refresh_seconds() -> u64 {
    60
}

fn default_hard_refresh_seconds() -> u64 {
    600
}

fn default_country_header() -> String {
    "x-client-country".to_string()
}

/// Shared directory store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` database URL holding the published directory. Defaults to
    /// `sqlite://db/directory.db`.
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_database_url() -> String {
    "sqlite://db/directory.db".to_string()
}

/// Validation-service and scheduling settings for the sync process.
///
/// `validation_url` and `auth_token` have no usable defaults; they are
/// required whenever the sync binary runs (see [`AppConfig::validate_sync`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Endpoint of the private validation API.
    #[serde(default)]
    pub validation_url: String,

    /// Token identifying this deployment to the validation API.
    #[serde(default)]
    pub auth_token: String,

    /// Validation window in milliseconds. With a 30-minute window and
    /// 10-minute validation rounds, the past three rounds must all have
    /// passed. Defaults to `1800000`.
    #[serde(default = "default_time_offset_ms")]
    pub time_offset_ms: u64,

    /// Request endpoints validated against mainnet (`true`) or testnet.
    /// Defaults to `true`.
    #[serde(default = "default_mainnet")]
    pub mainnet: bool,

    /// Restrict results to TLS-terminated endpoints. Defaults to `true`.
    #[serde(default = "default_ssl_only")]
    pub ssl_only: bool,

    /// Seconds between scheduled sync runs. Defaults to `600`.
    #[serde(default = "default_sync_interval_seconds")]
    pub interval_seconds: u64,

    /// Per-fetch timeout in seconds against the validation service.
    /// Defaults to `10`.
    #[serde(default = "default_sync_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_time_offset_ms() -> u64 {
    1_800_000
}

fn default_mainnet() -> bool {
    true
}

fn default_ssl_only() -> bool {
    true
}

fn default_sync_interval_seconds() -> u64 {
    600
}

fn default_sync_request_timeout_seconds() -> u64 {
    10
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g. "trace", "debug", "info", "warn", "error").
    /// Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Root application configuration for both the gateway and sync binaries.
///
/// Loaded from TOML with `MERIDIAN`-prefixed environment overrides using
/// `__` as the nesting separator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment (e.g. "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream_timeout_ms: default_upstream_timeout_ms(),
            max_retries: default_max_retries(),
            fallback_endpoints: Vec::new(),
            soft_refresh_seconds: default_soft_refresh_seconds(),
            hard_refresh_seconds: default_hard_refresh_seconds(),
            country_header: default_country_header(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { database_url: default_database_url() }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            validation_url: String::new(),
            auth_token: String::new(),
            time_offset_ms: default_time_offset_ms(),
            mainnet: default_mainnet(),
            ssl_only: default_ssl_only(),
            interval_seconds: default_sync_interval_seconds(),
            request_timeout_seconds: default_sync_request_timeout_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment overrides.
    ///
    /// Environment variables with the `MERIDIAN` prefix override any field,
    /// using `__` for nesting (e.g. `MERIDIAN__SERVER__BIND_PORT=3000`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("MERIDIAN").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` (overridable via the
    /// `MERIDIAN_CONFIG` environment variable), falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("MERIDIAN_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// The forwarding engine's behavior knobs.
    #[must_use]
    pub fn forward_config(&self) -> ForwardConfig {
        ForwardConfig {
            upstream_timeout: Duration::from_millis(self.gateway.upstream_timeout_ms),
            max_retries: self.gateway.max_retries,
            fallback_endpoints: self.gateway.fallback_endpoints.clone(),
        }
    }

    /// The directory cache's staleness thresholds.
    #[must_use]
    pub fn cache_config(&self) -> DirectoryCacheConfig {
        DirectoryCacheConfig {
            soft_ttl: Duration::from_secs(self.gateway.soft_refresh_seconds),
            hard_ttl: Duration::from_secs(self.gateway.hard_refresh_seconds),
        }
    }

    /// The validation-service client settings for the sync process.
    #[must_use]
    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            url: self.sync.validation_url.clone(),
            auth_token: self.sync.auth_token.clone(),
            time_offset_ms: self.sync.time_offset_ms,
            mainnet: self.sync.mainnet,
            ssl_only: self.sync.ssl_only,
            request_timeout: Duration::from_secs(self.sync.request_timeout_seconds),
        }
    }

    /// Interval between scheduled sync runs.
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_seconds)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    /// Validates the fields the gateway binary depends on.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }

        if self.gateway.upstream_timeout_ms == 0 {
            return Err("Upstream timeout must be greater than 0".to_string());
        }

        if self.gateway.max_retries == 0 {
            return Err("Retry budget must be greater than 0".to_string());
        }

        if self.gateway.hard_refresh_seconds < self.gateway.soft_refresh_seconds {
            return Err("Hard refresh TTL must not be below the soft refresh TTL".to_string());
        }

        for endpoint in &self.gateway.fallback_endpoints {
            if !endpoint.starts_with("http") {
                return Err(format!("Invalid fallback endpoint URL: {endpoint}"));
            }
        }

        if self.store.database_url.is_empty() {
            return Err("Directory store database URL must not be empty".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }

    /// Validates the additional fields the sync binary depends on. All of
    /// them are required; there are no usable defaults for the validation
    /// service's location or credentials.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate_sync(&self) -> Result<(), String> {
        if self.sync.validation_url.is_empty() {
            return Err("Validation service URL is required for sync".to_string());
        }

        if !self.sync.validation_url.starts_with("http") {
            return Err(format!(
                "Invalid validation service URL: {}",
                self.sync.validation_url
            ));
        }

        if self.sync.auth_token.is_empty() {
            return Err("Validation service auth token is required for sync".to_string());
        }

        if self.sync.time_offset_ms == 0 {
            return Err("Validation time window must be greater than 0".to_string());
        }

        if self.sync.interval_seconds == 0 {
            return Err("Sync interval must be greater than 0".to_string());
        }

        Ok(())
    }
}
