//! Content pick lookup
//!
//! Public, identity-free read. The response shape is a strict
//! allowlisted subset of the stored row; internal curation and
//! source fields never leave this module.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::{ContentRow, ContentStore};

/// Allowlisted projection of a catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct PickProjection {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub tagline: String,
}

impl From<&ContentRow> for PickProjection {
    fn from(row: &ContentRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug.clone(),
            title: row.title.clone(),
            tagline: row.tagline.clone(),
        }
    }
}

/// Read-only pick service
pub struct ContentService {
    content: Arc<ContentStore>,
}

impl ContentService {
    pub fn new(content: Arc<ContentStore>) -> Self {
        Self { content }
    }

    /// Look up a pick by slug. Unknown slugs yield `None`, same as a
    /// row the caller is not allowed to see.
    pub fn get_pick(&self, slug: &str) -> Option<PickProjection> {
        self.content.get_by_slug(slug).map(|row| (&row).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_projection_is_allowlisted() {
        let store = Arc::new(ContentStore::new());
        let mut row = ContentRow::new("test-game", "Test Game", "A game for tests");
        row.curation_notes = Some("do not surface before launch".to_string());
        row.source_meta = json!({"feed": "partner-x"});
        store.upsert(row);

        let svc = ContentService::new(store);
        let pick = svc.get_pick("test-game").unwrap();
        assert_eq!(pick.slug, "test-game");

        let value = serde_json::to_value(&pick).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 4);
        assert!(!keys.contains(&"curation_notes"));
        assert!(!keys.contains(&"source_meta"));
    }

    #[test]
    fn test_unknown_slug_is_none() {
        let svc = ContentService::new(Arc::new(ContentStore::new()));
        assert!(svc.get_pick("missing").is_none());
    }
}
