//! # Meridian Core
//!
//! Core library for Meridian, a geography-aware API gateway for blockchain
//! HTTP APIs.
//!
//! This crate provides the foundational components for:
//!
//! - **[`routes`]**: Request path classification into API categories
//!   (chain / history / analytics / wallet), disabled routes, and unknowns.
//!
//! - **[`region`]**: Country-code to load-balancing-region resolution.
//!
//! - **[`directory`]**: The endpoint directory: wire format, the shared
//!   per-instance cache with its staleness-tolerant refresh policy, and the
//!   directory store the sync process publishes to.
//!
//! - **[`forward`]**: The forwarding engine: endpoint selection, bounded
//!   retries with region failover, outcome classification, and the
//!   standardized client-facing error responses.
//!
//! - **[`sync`]**: The directory synchronization engine that rebuilds the
//!   endpoint-to-region mapping from the external validation service.
//!
//! - **[`config`]**: Layered application configuration.
//!
//! ## Request Flow
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌──────────────┐
//! │ RouteTable   │ ── Unknown ──► 404    ── Disabled ──► 403
//! └──────┬───────┘
//!        │ Forward(category)
//!        ▼
//! ┌──────────────┐     ┌─────────────────┐
//! │ ForwardEngine│────►│ DirectoryCache  │◄── refresh ── DirectoryStore
//! │  (retries)   │     │ (ArcSwap + TTL) │                    ▲
//! └──────┬───────┘     └─────────────────┘                    │
//!        │                                              SyncEngine
//!        ▼                                                    ▲
//! Upstream endpoint (geo bucket, random pick, failover)       │
//!                                            Validation service (×4 categories)
//! ```

pub mod config;
pub mod directory;
pub mod forward;
pub mod region;
pub mod routes;
pub mod sync;
pub mod types;
