//! Shared types and the structural error enum
//!
//! Domain-level outcomes (unknown event type, replayed code, burned
//! ticket, foreign-owner write) are never errors: services fold them
//! into boolean `ok` results so a caller cannot map the defenses.
//! `PickgateError` covers only structural failures.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Verified caller identity, issued by the identity collaborator.
///
/// Opaque and immutable; services derive row ownership from this value
/// only, never from caller-supplied fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Structural failures that abort an operation
#[derive(Debug, thiserror::Error)]
pub enum PickgateError {
    /// Configuration is invalid at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request body could not be read or parsed
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Token minting/validation plumbing failed
    #[error("Auth error: {0}")]
    Auth(String),

    /// Network/IO failure in the server loop
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else that should abort the call
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PickgateError>;
