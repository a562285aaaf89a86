//! Identity context for Pickgate
//!
//! Token issuance lives with the external identity provider; this
//! module only verifies bearer tokens and yields the opaque caller
//! identity every service keys ownership on. Dev mode additionally
//! mints tokens so black-box probes can sign in.

pub mod jwt;

pub use jwt::{extract_token_from_header, Claims, JwtValidator};
