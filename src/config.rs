//! Configuration for Pickgate
//!
//! CLI arguments and environment variable handling using clap.
//! Allowlists are parsed once at startup; services hold their own
//! copies after that.

use clap::Parser;
use std::collections::HashSet;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::types::{PickgateError, Result};

/// Default event-type allowlist, matching the interaction vocabulary
/// of the picks app.
pub const DEFAULT_EVENT_TYPES: &str = "impression,swipe_left,swipe_right,save,unsave,clickout,test";

/// Pickgate - write-path enforcement gateway for the picks backend
#[derive(Parser, Debug, Clone)]
#[command(name = "pickgate")]
#[command(about = "Write-path enforcement gateway for the picks backend")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (permits the dev sign-in endpoint and a
    /// default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JWT secret for token verification (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Accepted interaction writes per identity per rolling minute.
    /// Calls beyond the ceiling still report success but are silently
    /// not persisted.
    #[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value = "60")]
    pub rate_limit_per_minute: u32,

    /// Comma-separated allowlist of accepted interaction event types
    #[arg(long, env = "EVENT_TYPE_ALLOWLIST", default_value = DEFAULT_EVENT_TYPES)]
    pub event_type_allowlist: String,

    /// Comma-separated allowlist of hosts clickout tickets may
    /// redirect to (e.g. "store.example.com,itch.io")
    #[arg(long, env = "CLICKOUT_ALLOW_HOSTS", default_value = "")]
    pub clickout_allow_hosts: String,

    /// Seed demo content and redirects at startup (dev mode only)
    #[arg(long, env = "SEED_DEMO_CONTENT", default_value = "false")]
    pub seed_demo_content: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> Result<String> {
        if self.dev_mode {
            Ok(self
                .jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string()))
        } else {
            self.jwt_secret.clone().ok_or_else(|| {
                PickgateError::Config("JWT_SECRET is required in production mode".to_string())
            })
        }
    }

    /// Parse the event-type allowlist into a set
    pub fn event_types(&self) -> HashSet<String> {
        parse_list(&self.event_type_allowlist)
    }

    /// Parse the clickout host allowlist into a set
    pub fn clickout_hosts(&self) -> HashSet<String> {
        parse_list(&self.clickout_allow_hosts)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.rate_limit_per_minute == 0 {
            return Err("RATE_LIMIT_PER_MINUTE must be at least 1".to_string());
        }

        if self.event_types().is_empty() {
            return Err("EVENT_TYPE_ALLOWLIST must not be empty".to_string());
        }

        if self.seed_demo_content && !self.dev_mode {
            return Err("SEED_DEMO_CONTENT requires DEV_MODE".to_string());
        }

        Ok(())
    }
}

fn parse_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
