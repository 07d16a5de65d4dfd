//! In-process record store.
//!
//! Records live for the lifetime of the process. Used when no database is
//! configured, and by the tests.

use super::{ExtractionRecord, RecordStore, StoredRecord};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Vec<StoredRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert_one(&self, record: &ExtractionRecord) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut records = self.inner.write().await;
        records.push(StoredRecord {
            id: id.clone(),
            filename: record.filename.clone(),
            text: record.text.clone(),
        });
        tracing::debug!("MemoryStore: stored '{}' as {}", record.filename, id);
        Ok(id)
    }

    async fn find_all(&self) -> anyhow::Result<Vec<StoredRecord>> {
        Ok(self.inner.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str, text: &str) -> ExtractionRecord {
        ExtractionRecord {
            filename: filename.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_in_order() {
        let store = MemoryStore::new();
        let first = store.insert_one(&record("a.png", "one")).await.unwrap();
        let second = store.insert_one(&record("b.pdf", "two")).await.unwrap();
        assert_ne!(first, second);

        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first);
        assert_eq!(all[0].filename, "a.png");
        assert_eq!(all[1].text, "two");
    }

    #[tokio::test]
    async fn test_duplicate_filenames_are_kept() {
        let store = MemoryStore::new();
        store.insert_one(&record("same.png", "x")).await.unwrap();
        store.insert_one(&record("same.png", "y")).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_listing_is_repeatable() {
        let store = MemoryStore::new();
        store.insert_one(&record("a.png", "one")).await.unwrap();
        let first = store.find_all().await.unwrap();
        let second = store.find_all().await.unwrap();
        assert_eq!(first, second);
    }
}
