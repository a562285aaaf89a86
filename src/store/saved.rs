//! Saved-mark rows
//!
//! Per-user, per-target boolean keyed by `(owner, target_id)` with
//! upsert semantics. Applying the same desired state twice is a no-op.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::types::UserId;

/// Current saved state for one `(owner, target)` pair
#[derive(Debug, Clone)]
pub struct SavedMark {
    pub owner: UserId,
    pub target_id: Uuid,
    pub saved: bool,
    pub updated_at: DateTime<Utc>,
}

/// Concurrent saved-mark table
pub struct SavedStore {
    marks: DashMap<(UserId, Uuid), SavedMark>,
}

impl SavedStore {
    pub fn new() -> Self {
        Self {
            marks: DashMap::new(),
        }
    }

    /// Upsert the desired state. Returns true if the stored state
    /// changed (a repeat of the current state leaves the row alone,
    /// including its timestamp).
    pub fn set(&self, owner: UserId, target_id: Uuid, saved: bool) -> bool {
        let mut entry = self.marks.entry((owner, target_id)).or_insert(SavedMark {
            owner,
            target_id,
            saved: !saved, // forces the write below for a fresh mark
            updated_at: Utc::now(),
        });

        if entry.saved == saved {
            return false;
        }

        entry.saved = saved;
        entry.updated_at = Utc::now();
        true
    }

    /// Marks currently saved by `owner`, newest first
    pub fn list_saved(&self, owner: UserId, limit: usize) -> Vec<SavedMark> {
        let mut marks: Vec<SavedMark> = self
            .marks
            .iter()
            .filter(|e| e.key().0 == owner && e.value().saved)
            .map(|e| e.value().clone())
            .collect();
        marks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        marks.truncate(limit);
        marks
    }

    /// Re-point every mark owned by `from` to `to` (transfer merge).
    /// On key collision the target's existing mark wins.
    pub fn reassign_owner(&self, from: UserId, to: UserId) -> usize {
        let keys: Vec<(UserId, Uuid)> = self
            .marks
            .iter()
            .filter(|e| e.key().0 == from)
            .map(|e| *e.key())
            .collect();

        let mut moved = 0;
        for (_, target_id) in keys {
            if let Some((_, mut mark)) = self.marks.remove(&(from, target_id)) {
                mark.owner = to;
                if let dashmap::mapref::entry::Entry::Vacant(slot) =
                    self.marks.entry((to, target_id))
                {
                    slot.insert(mark);
                    moved += 1;
                }
            }
        }
        moved
    }
}

impl Default for SavedStore {
    fn default() -> Self {
        Self::new()
    }
}
