//! Keyed in-memory document store with sweep-based eviction.
//!
//! Uploaded containers live here between analysis and download. Entries
//! are evicted by an externally driven sweep on a fixed schedule rather
//! than a per-item timer, so eviction is deterministic and testable:
//! the caller decides what "now" is and how often to sweep.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

/// One stored upload.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<String, StoredDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retention period used by callers that have no reason to pick
    /// their own.
    pub fn default_ttl() -> Duration {
        Duration::hours(1)
    }

    /// Store a document and return its generated id.
    pub fn insert(&mut self, filename: impl Into<String>, bytes: Vec<u8>) -> String {
        let id = Uuid::new_v4().to_string();
        let doc = StoredDocument {
            id: id.clone(),
            filename: filename.into(),
            bytes,
            uploaded_at: Utc::now(),
        };
        info!(id = %doc.id, filename = %doc.filename, size = doc.bytes.len(), "stored document");
        self.documents.insert(id.clone(), doc);
        id
    }

    pub fn get(&self, id: &str) -> Option<&StoredDocument> {
        self.documents.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<StoredDocument> {
        self.documents.remove(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Evict every document older than `ttl` as of `now`. Returns how
    /// many entries were removed.
    pub fn sweep(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.documents.len();
        self.documents.retain(|_, doc| now - doc.uploaded_at < ttl);
        let removed = before - self.documents.len();
        if removed > 0 {
            info!(removed, remaining = self.documents.len(), "swept expired documents");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_and_fetch_round_trip() {
        let mut store = DocumentStore::new();
        let id = store.insert("deck.pptx", vec![1, 2, 3]);
        let doc = store.get(&id).unwrap();
        assert_eq!(doc.filename, "deck.pptx");
        assert_eq!(doc.bytes, vec![1, 2, 3]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sweep_is_deterministic_against_a_supplied_clock() {
        let mut store = DocumentStore::new();
        store.insert("a.pptx", Vec::new());
        store.insert("b.pptx", Vec::new());

        // Nothing is old enough yet.
        assert_eq!(store.sweep(Utc::now(), DocumentStore::default_ttl()), 0);
        assert_eq!(store.len(), 2);

        // Advance the caller's clock past the TTL.
        let later = Utc::now() + Duration::hours(2);
        assert_eq!(store.sweep(later, DocumentStore::default_ttl()), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn remove_returns_the_document() {
        let mut store = DocumentStore::new();
        let id = store.insert("deck.pptx", vec![9]);
        let doc = store.remove(&id).unwrap();
        assert_eq!(doc.bytes, vec![9]);
        assert!(store.get(&id).is_none());
    }
}
