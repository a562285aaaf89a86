//! JWT token validation
//!
//! HS256 bearer tokens whose `sub` claim carries the verified user id.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{PickgateError, Result, UserId};

/// Claims carried by a pickgate bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (the verified identity)
    pub sub: String,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

impl Claims {
    /// Parse the subject into a user id
    pub fn user_id(&self) -> Result<UserId> {
        let uuid = Uuid::parse_str(&self.sub).map_err(|_| PickgateError::Unauthorized)?;
        Ok(UserId(uuid))
    }
}

/// Validates (and in dev mode mints) bearer tokens
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Mint a token for a user (dev sign-in path)
    pub fn issue(&self, user_id: UserId) -> Result<(String, u64)> {
        let now = Utc::now().timestamp() as u64;
        let expires_at = now + self.expiry_seconds;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: expires_at,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| PickgateError::Auth(format!("Failed to sign token: {}", e)))?;

        Ok((token, expires_at))
    }

    /// Validate a token, returning its claims
    pub fn validate(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| PickgateError::Unauthorized)
    }

    /// Validate a bearer header end-to-end, yielding the caller identity
    pub fn identity_from_header(&self, auth_header: Option<&str>) -> Result<UserId> {
        let token = extract_token_from_header(auth_header).ok_or(PickgateError::Unauthorized)?;
        self.validate(token)?.user_id()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
