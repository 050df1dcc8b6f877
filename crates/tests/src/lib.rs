//! Integration Tests for the Meridian Gateway
//!
//! This crate contains the cross-component test modules:
//!
//! - `forwarding_tests`: End-to-end forwarding through the engine against
//!   mock upstream endpoints
//! - `failover_tests`: Endpoint, region, and fallback-list failover plus
//!   outcome classification
//! - `directory_cache_tests`: Staleness policy and shared pruning observed
//!   through the full engine
//! - `sync_tests`: Sync runs against a mock validation service, including
//!   the published payload feeding a live gateway
//! - `mock_infrastructure`: Reusable mock types (upstream endpoints, the
//!   validation service) built on mockito
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! No external services are required; every upstream and the validation
//! service are mockito servers bound to localhost.

pub mod mock_infrastructure;


#[cfg(test)]
mod failover_tests;


#[cfg(test)]
mod sync_tests;
