//! Idempotency admission
//!
//! First-writer-wins admission on `(owner, event_uuid)`. Keys are
//! permanent: a replay arbitrarily later still collapses onto the
//! original admission.

use dashmap::DashMap;
use uuid::Uuid;

use crate::types::UserId;

/// Deduplicates logically-identical write attempts
pub struct IdempotencyStore {
    seen: DashMap<(UserId, Uuid), ()>,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self {
            seen: DashMap::new(),
        }
    }

    /// Admit an `(owner, event_uuid)` pair.
    ///
    /// Returns true for exactly one caller per pair, under any
    /// interleaving: the DashMap entry guard serializes admission for
    /// the key.
    pub fn admit(&self, owner: UserId, event_uuid: Uuid) -> bool {
        match self.seen.entry((owner, event_uuid)) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        }
    }
}

impl Default for IdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_admission_only() {
        let store = IdempotencyStore::new();
        let owner = UserId::new();
        let eid = Uuid::new_v4();

        assert!(store.admit(owner, eid));
        for _ in 0..10 {
            assert!(!store.admit(owner, eid));
        }
    }

    #[test]
    fn test_keys_are_owner_scoped() {
        let store = IdempotencyStore::new();
        let eid = Uuid::new_v4();

        assert!(store.admit(UserId::new(), eid));
        assert!(store.admit(UserId::new(), eid));
    }

    #[tokio::test]
    async fn test_exactly_one_concurrent_winner() {
        let store = Arc::new(IdempotencyStore::new());
        let owner = UserId::new();
        let eid = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.admit(owner, eid) }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
