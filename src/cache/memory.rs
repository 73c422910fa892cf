//! Memory Tier Module
//!
//! Unbounded in-process lookup table of records. It has no eviction policy
//! of its own; the evict engine and the size evictor remove entries.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use crate::cache::StoredRecord;

// == Memory Tier ==
/// Key to record map shared by the foreground engines and background tasks.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<String, StoredRecord>>,
}

impl MemoryTier {
    /// Creates an empty memory tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the record stored under `key`.
    pub async fn get(&self, key: &str) -> Option<StoredRecord> {
        self.entries.read().await.get(key).cloned()
    }

    /// Stores `record` under `key`, replacing any previous record.
    pub async fn put(&self, key: String, record: StoredRecord) {
        self.entries.write().await.insert(key, record);
    }

    /// Removes the record under `key`, if any.
    pub async fn evict(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Removes every record.
    pub async fn evict_all(&self) {
        self.entries.write().await.clear();
    }

    /// Snapshot of the keys currently held. No ordering guarantee.
    pub async fn keys(&self) -> HashSet<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
