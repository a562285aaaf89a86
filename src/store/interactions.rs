//! Interaction event rows
//!
//! Append-only table keyed by `(owner, event_uuid)`. The key is the
//! idempotency constraint: a second insert with the same pair is a
//! no-op, surviving concurrent retries without duplicate rows. Rows
//! are never user-mutated; the only ownership change is the transfer
//! merge, which re-points every row of one owner to another.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use crate::types::UserId;

/// One recorded interaction event
#[derive(Debug, Clone)]
pub struct InteractionRow {
    pub owner: UserId,
    pub event_uuid: Uuid,
    pub event_type: String,
    pub target_id: Option<Uuid>,
    pub meta: JsonValue,
    pub created_at: DateTime<Utc>,
}

/// Concurrent interaction table
pub struct InteractionStore {
    rows: DashMap<(UserId, Uuid), InteractionRow>,
}

impl InteractionStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    /// Insert a row unless `(owner, event_uuid)` already exists.
    ///
    /// Returns true if the row was inserted. The DashMap entry guard
    /// holds the shard lock for the key, so exactly one of N
    /// concurrent callers with the same key inserts.
    pub fn insert_ignore(&self, row: InteractionRow) -> bool {
        let key = (row.owner, row.event_uuid);
        match self.rows.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(row);
                true
            }
        }
    }

    /// Number of rows owned by `owner`
    pub fn count_for(&self, owner: UserId) -> usize {
        self.rows.iter().filter(|e| e.key().0 == owner).count()
    }

    /// Rows owned by `owner`, newest first
    pub fn list_for(&self, owner: UserId, limit: usize) -> Vec<InteractionRow> {
        let mut rows: Vec<InteractionRow> = self
            .rows
            .iter()
            .filter(|e| e.key().0 == owner)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        rows
    }

    /// Re-point every row owned by `from` to `to` (transfer merge).
    ///
    /// Returns the number of rows migrated. If `to` already owns a row
    /// with the same event uuid, that row wins and the duplicate is
    /// dropped, so the target's count never decreases.
    pub fn reassign_owner(&self, from: UserId, to: UserId) -> usize {
        let keys: Vec<(UserId, Uuid)> = self
            .rows
            .iter()
            .filter(|e| e.key().0 == from)
            .map(|e| *e.key())
            .collect();

        let mut moved = 0;
        for key in keys {
            if let Some((_, mut row)) = self.rows.remove(&key) {
                row.owner = to;
                if self.insert_ignore(row) {
                    moved += 1;
                }
            }
        }

        debug!("Reassigned {} interaction rows {} -> {}", moved, from, to);
        moved
    }
}

impl Default for InteractionStore {
    fn default() -> Self {
        Self::new()
    }
}
