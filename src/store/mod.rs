//! Record store abstraction.
//!
//! Extraction records are append-only `{filename, text}` pairs. Backends assign
//! the identifier; filenames are not unique.

pub mod memory;
pub mod supabase;

use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// A record about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub filename: String,
    pub text: String,
}

/// A record as returned by the store, serialized as `{_id, filename, text}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub filename: String,
    pub text: String,
}

/// Async trait implemented by each persistence backend.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &str;

    /// Persist one record, returning the identifier it was stored under.
    async fn insert_one(&self, record: &ExtractionRecord) -> anyhow::Result<String>;

    /// Every stored record, in insertion order where the backend keeps one.
    async fn find_all(&self) -> anyhow::Result<Vec<StoredRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_record_uses_underscore_id() {
        let record = StoredRecord {
            id: "abc".to_string(),
            filename: "scan.png".to_string(),
            text: "Hello".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"_id": "abc", "filename": "scan.png", "text": "Hello"})
        );
    }
}
