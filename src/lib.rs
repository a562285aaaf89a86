//! Pickgate - write-path enforcement gateway for the picks backend
//!
//! Every mutating call flows verified identity -> ownership policy ->
//! (rate limiter / idempotency admission where applicable) -> service
//! -> row store. Reads flow identity -> policy -> allowlisted
//! projection. Domain rejections are deliberately information-free.
//!
//! ## Services
//!
//! - **Ingest**: allowlist-gated, idempotent interaction logging with
//!   silent per-identity rate limiting
//! - **Saved**: idempotent save toggle with an allowlisted projection
//! - **Content**: public pick lookup through a strict field allowlist
//! - **Transfer**: single-use merge codes with atomic account merge
//! - **Clickout**: single-use redirect tickets gated by a host allowlist

pub mod auth;
pub mod clickout;
pub mod config;
pub mod content;
pub mod ingest;
pub mod policy;
pub mod routes;
pub mod saved;
pub mod server;
pub mod store;
pub mod transfer;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{PickgateError, Result, UserId};
