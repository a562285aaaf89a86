//! Saved-state service
//!
//! Idempotent per-user save toggle with an allowlisted read
//! projection. The current state is keyed by `(owner, target)` and is
//! independent of the idempotency store; the supplied event uuid only
//! deduplicates the audit trail, which flows through the same
//! ingestion pipeline as every other interaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::ingest::IngestService;
use crate::store::{ContentStore, SavedStore};
use crate::types::UserId;

/// Allowlisted projection of a saved entry joined with its target.
/// Audit fields (metadata, event type) are deliberately absent.
#[derive(Debug, Clone, Serialize)]
pub struct SavedProjection {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub saved_at: DateTime<Utc>,
}

/// Saved-mark toggle and listing
pub struct SavedService {
    saved: Arc<SavedStore>,
    content: Arc<ContentStore>,
    ingest: Arc<IngestService>,
}

impl SavedService {
    pub fn new(
        saved: Arc<SavedStore>,
        content: Arc<ContentStore>,
        ingest: Arc<IngestService>,
    ) -> Self {
        Self {
            saved,
            content,
            ingest,
        }
    }

    /// Set the desired saved state for a target.
    ///
    /// Idempotent: applying the current state again is a no-op
    /// state-wise but the audit event is still offered to ingestion,
    /// where the event uuid collapses replays. Unknown targets fail
    /// generically, indistinguishable from any other domain rejection.
    pub fn set_saved(
        &self,
        identity: UserId,
        target_id: Uuid,
        desired: bool,
        event_uuid: Uuid,
    ) -> bool {
        if self.content.get(target_id).is_none() {
            return false;
        }

        self.saved.set(identity, target_id, desired);

        let event_type = if desired { "save" } else { "unsave" };
        self.ingest.log_event(
            identity,
            None,
            event_uuid,
            event_type,
            Some(target_id),
            json!({}),
        );

        true
    }

    /// The caller's saved entries, joined to content, newest first.
    /// Marks pointing at content that has since vanished are skipped.
    pub fn get_saved(&self, identity: UserId, limit: usize) -> Vec<SavedProjection> {
        self.saved
            .list_saved(identity, limit)
            .into_iter()
            .filter_map(|mark| {
                let row = self.content.get(mark.target_id)?;
                Some(SavedProjection {
                    id: row.id,
                    slug: row.slug,
                    title: row.title,
                    saved_at: mark.updated_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::IngestConfig;
    use crate::store::{ContentRow, InteractionStore};

    fn setup() -> (SavedService, Arc<IngestService>, Uuid) {
        let content = Arc::new(ContentStore::new());
        let row = ContentRow::new("test-game", "Test Game", "A game for tests");
        let target = row.id;
        content.upsert(row);

        let config = IngestConfig {
            allowed_event_types: ["save", "unsave"].iter().map(|s| s.to_string()).collect(),
            rate_limit_per_minute: 60,
        };
        let ingest = Arc::new(IngestService::new(config, Arc::new(InteractionStore::new())));
        let svc = SavedService::new(
            Arc::new(SavedStore::new()),
            content,
            Arc::clone(&ingest),
        );
        (svc, ingest, target)
    }

    #[test]
    fn test_save_then_unsave_round_trip() {
        let (svc, _, target) = setup();
        let user = UserId::new();

        assert!(svc.set_saved(user, target, true, Uuid::new_v4()));
        let saved = svc.get_saved(user, 50);
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].slug, "test-game");

        assert!(svc.set_saved(user, target, false, Uuid::new_v4()));
        assert!(svc.get_saved(user, 50).is_empty());
    }

    #[test]
    fn test_projection_has_no_audit_fields() {
        let (svc, _, target) = setup();
        let user = UserId::new();
        svc.set_saved(user, target, true, Uuid::new_v4());

        let value = serde_json::to_value(&svc.get_saved(user, 50)[0]).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("meta"));
        assert!(!obj.contains_key("event_type"));
        assert!(!obj.contains_key("owner"));
    }

    #[test]
    fn test_audit_event_is_deduplicated() {
        let (svc, ingest, target) = setup();
        let user = UserId::new();
        let eid = Uuid::new_v4();

        // Same event uuid replayed: one audit row.
        assert!(svc.set_saved(user, target, true, eid));
        assert!(svc.set_saved(user, target, true, eid));
        assert_eq!(ingest.count_events(user), 1);
    }

    #[test]
    fn test_unknown_target_fails_generically() {
        let (svc, ingest, _) = setup();
        let user = UserId::new();

        assert!(!svc.set_saved(user, Uuid::new_v4(), true, Uuid::new_v4()));
        assert_eq!(ingest.count_events(user), 0);
    }

    #[test]
    fn test_saved_lists_are_private() {
        let (svc, _, target) = setup();
        let a = UserId::new();
        let b = UserId::new();

        svc.set_saved(a, target, true, Uuid::new_v4());
        assert!(svc.get_saved(b, 50).is_empty());
    }
}
