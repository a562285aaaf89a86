//! Interaction ingestion service
//!
//! The only write path into the interaction table. Owner is stamped
//! from the verified identity; a caller-supplied owner claim that
//! names anyone else fails the policy check. Domain rejections fold
//! into the boolean result with no detail attached.

use chrono::Utc;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ingest::{IdempotencyStore, RateLimiter};
use crate::policy;
use crate::store::{InteractionRow, InteractionStore};
use crate::types::UserId;

/// Ingestion pipeline configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Accepted event types (closed set, loaded at startup)
    pub allowed_event_types: HashSet<String>,
    /// Accepted writes per identity per rolling minute
    pub rate_limit_per_minute: u32,
}

/// Validates and records interaction events
pub struct IngestService {
    config: IngestConfig,
    idempotency: IdempotencyStore,
    limiter: RateLimiter,
    interactions: Arc<InteractionStore>,
}

impl IngestService {
    pub fn new(config: IngestConfig, interactions: Arc<InteractionStore>) -> Self {
        let limiter = RateLimiter::per_minute(config.rate_limit_per_minute);
        Self {
            config,
            idempotency: IdempotencyStore::new(),
            limiter,
            interactions,
        }
    }

    /// Record an interaction event under the caller's identity.
    ///
    /// Returns the outward `ok` verdict:
    /// - unknown event type or spoofed owner claim: `false`, no detail
    /// - replayed event uuid: `true` (idempotent no-op)
    /// - over the rate ceiling: `true`, silently not persisted
    /// - otherwise: `true`, row persisted
    pub fn log_event(
        &self,
        identity: UserId,
        claimed_owner: Option<UserId>,
        event_uuid: Uuid,
        event_type: &str,
        target_id: Option<Uuid>,
        meta: JsonValue,
    ) -> bool {
        if !policy::can_write(identity, claimed_owner) {
            warn!("Rejected spoofed-owner write from {}", identity);
            return false;
        }

        if !self.config.allowed_event_types.contains(event_type) {
            debug!("Rejected event type for {}", identity);
            return false;
        }

        // Idempotency before rate limiting: a retry of an accepted
        // event must collapse, not burn limiter budget.
        if !self.idempotency.admit(identity, event_uuid) {
            return true;
        }

        if !self.limiter.try_admit(identity, Instant::now()) {
            debug!("Rate ceiling reached for {}; dropping silently", identity);
            return true;
        }

        self.interactions.insert_ignore(InteractionRow {
            owner: identity,
            event_uuid,
            event_type: event_type.to_string(),
            target_id,
            meta,
            created_at: Utc::now(),
        });
        true
    }

    /// Rows visible to the caller (strict self-ownership)
    pub fn list_events(&self, identity: UserId, limit: usize) -> Vec<InteractionRow> {
        self.interactions
            .list_for(identity, limit)
            .into_iter()
            .filter(|row| policy::can_read(identity, row.owner))
            .collect()
    }

    /// Count of rows visible to the caller
    pub fn count_events(&self, identity: UserId) -> usize {
        self.interactions.count_for(identity)
    }
}
