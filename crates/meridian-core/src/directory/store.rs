//! The shared directory store.
//!
//! A last-writer-wins key-value store: the sync process is the sole writer
//! of the `"all"` entry, gateway instances are read-only clients. The trait
//! keeps the backend swappable; `SQLite` is the shipped shared backend and
//! the in-memory store backs tests and embedded setups.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::str::FromStr;
use thiserror::Error;

/// Errors from directory store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid store configuration: {0}")]
    Configuration(String),
}

/// Key-value interface over the shared directory store.
///
/// `get` of an absent key is `Ok(None)`; `put` overwrites unconditionally.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `SQLite`-backed store shared between the gateway and sync processes on one
/// host.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the store database and ensures the
    /// directory table exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL is invalid or the connection or
    /// schema setup fails.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Configuration(format!("{database_url}: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS directory (
                entry_key TEXT PRIMARY KEY,
                entry_value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DirectoryStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        use sqlx::Row;

        let row = sqlx::query("SELECT entry_value FROM directory WHERE entry_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_get::<String, _>("entry_value"))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO directory (entry_key, entry_value, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(entry_key) DO UPDATE SET
                entry_value = excluded.entry_value,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
