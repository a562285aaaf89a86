//! Interaction ingestion pipeline
//!
//! Allowlist gate, idempotent admission, silent rate limiting, then
//! persistence under the verified identity. Checked in that order so
//! a legitimately-retried accepted event is never starved by a
//! limiter that has since filled up.

pub mod idempotency;
pub mod rate_limit;
pub mod service;

pub use idempotency::IdempotencyStore;
pub use rate_limit::RateLimiter;
pub use service::{IngestConfig, IngestService};
