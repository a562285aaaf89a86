//! Content rows (games)
//!
//! Public catalog entries looked up by slug. The stored row carries
//! internal fields the read projections must never expose; the
//! allowlisting happens in the `content` and `saved` services, not
//! here.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// One catalog entry
#[derive(Debug, Clone)]
pub struct ContentRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub tagline: String,
    /// Internal curation notes, never projected
    pub curation_notes: Option<String>,
    /// Ingest-source metadata, never projected
    pub source_meta: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl ContentRow {
    pub fn new(slug: &str, title: &str, tagline: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: title.to_string(),
            tagline: tagline.to_string(),
            curation_notes: None,
            source_meta: JsonValue::Null,
            created_at: Utc::now(),
        }
    }
}

/// Concurrent content table with a slug index
pub struct ContentStore {
    rows: DashMap<Uuid, ContentRow>,
    slug_index: DashMap<String, Uuid>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            slug_index: DashMap::new(),
        }
    }

    /// Insert or replace a catalog entry
    pub fn upsert(&self, row: ContentRow) {
        self.slug_index.insert(row.slug.clone(), row.id);
        self.rows.insert(row.id, row);
    }

    pub fn get(&self, id: Uuid) -> Option<ContentRow> {
        self.rows.get(&id).map(|e| e.value().clone())
    }

    pub fn get_by_slug(&self, slug: &str) -> Option<ContentRow> {
        let id = *self.slug_index.get(slug)?;
        self.get(id)
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}
