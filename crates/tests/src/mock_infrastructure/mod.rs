//! Mock Infrastructure for Testing the Meridian Gateway
//!
//! Reusable mock types for exercising the forwarding and sync engines
//! without real network dependencies.
//!
//! ## Components
//!
//! - `UpstreamMock`: wraps mockito to stand in for one upstream API endpoint
//! - `ValidationMock`: wraps mockito to stand in for the validation service
//! - `test_helpers`: harness wiring store, cache, and engine together

pub mod test_helpers;

pub use test_helpers::GatewayHarness;
pub use upstream_mock::UpstreamMock;
pub use validation_mock::ValidationMock;
