//! Retrieve Engine Module
//!
//! Looks a composite key up in memory, then persistence, applies the
//! caller's life time and evicts the narrowest matching family on expiry.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{compose, EvictRecord, MemoryTier, Source, StoredRecord};
use crate::persistence::Persistence;

// == Retrieve Record ==
/// Two-tier read path with read-through into memory.
#[derive(Clone)]
pub struct RetrieveRecord {
    memory: Arc<MemoryTier>,
    persistence: Arc<dyn Persistence>,
    evict: EvictRecord,
    encrypt_key: Option<String>,
}

impl RetrieveRecord {
    pub fn new(
        memory: Arc<MemoryTier>,
        persistence: Arc<dyn Persistence>,
        evict: EvictRecord,
        encrypt_key: Option<String>,
    ) -> Self {
        Self {
            memory,
            persistence,
            evict,
            encrypt_key,
        }
    }

    // == Retrieve ==
    /// Returns the record for the given keys, or `None` when it is absent
    /// or expired and stale data was not requested.
    ///
    /// # Arguments
    /// * `use_expired_if_unavailable` - Return an expired record after evicting it
    /// * `life_time_ms` - Life time the caller applies to this read
    /// * `encrypted` - Whether the persisted record is encrypted
    pub async fn retrieve(
        &self,
        provider_key: &str,
        dynamic_key: &str,
        dynamic_key_group: &str,
        use_expired_if_unavailable: bool,
        life_time_ms: Option<u64>,
        encrypted: bool,
    ) -> Option<StoredRecord> {
        let composite = compose(provider_key, dynamic_key, dynamic_key_group);

        let mut record = match self.memory.get(&composite).await {
            Some(mut record) => {
                record.set_source(Source::Memory);
                record
            }
            None => {
                let mut record = self
                    .persistence
                    .retrieve_record(&composite, encrypted, self.encrypt_key.as_deref())
                    .await?;
                record.set_source(Source::Persistence);
                self.memory.put(composite.clone(), record.clone()).await;
                record
            }
        };

        // Life time belongs to the call site, not to the stored value
        record.set_life_time_ms(life_time_ms);

        if !record.is_expired() {
            return Some(record);
        }

        debug!("Record {} expired, evicting its family", composite);
        if !dynamic_key_group.is_empty() {
            self.evict
                .evict_exact_group(provider_key, dynamic_key, dynamic_key_group)
                .await;
        } else if !dynamic_key.is_empty() {
            self.evict
                .evict_dynamic_key_family(provider_key, dynamic_key)
                .await;
        } else {
            self.evict.evict_provider_family(provider_key).await;
        }

        if use_expired_if_unavailable {
            Some(record)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Record;
    use crate::testing::MockPersistence;
    use serde_json::json;
    use std::time::Duration;

    fn engine() -> (RetrieveRecord, Arc<MemoryTier>, Arc<MockPersistence>) {
        let memory = Arc::new(MemoryTier::new());
        let persistence = Arc::new(MockPersistence::new(1.0));
        let evict = EvictRecord::new(memory.clone(), persistence.clone());
        let retrieve = RetrieveRecord::new(memory.clone(), persistence.clone(), evict, None);
        (retrieve, memory, persistence)
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let (retrieve, _, _) = engine();
        assert!(retrieve.retrieve("p", "", "", true, None, false).await.is_none());
    }

    #[tokio::test]
    async fn test_persistence_hit_reads_through() {
        let (retrieve, memory, persistence) = engine();
        let composite = compose("p", "1", "");
        persistence.seed(&composite, Record::new(json!("v"), None, true));

        let first = retrieve.retrieve("p", "1", "", false, None, false).await.unwrap();
        assert_eq!(first.source(), Source::Persistence);
        assert!(memory.get(&composite).await.is_some());

        let second = retrieve.retrieve("p", "1", "", false, None, false).await.unwrap();
        assert_eq!(second.source(), Source::Memory);
        assert_eq!(second.data(), &json!("v"));
    }

    #[tokio::test]
    async fn test_life_time_reassigned_per_call() {
        let (retrieve, memory, _) = engine();
        memory
            .put(compose("p", "", ""), Record::new(json!(1), None, true))
            .await;

        let record = retrieve
            .retrieve("p", "", "", false, Some(60_000), false)
            .await
            .unwrap();
        assert_eq!(record.life_time_ms(), Some(60_000));
    }

    #[tokio::test]
    async fn test_zero_life_time_is_always_expired() {
        let (retrieve, memory, _) = engine();
        memory
            .put(compose("p", "", ""), Record::new(json!(1), None, true))
            .await;

        assert!(retrieve.retrieve("p", "", "", false, Some(0), false).await.is_none());
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_returned_only_when_stale_allowed() {
        let (retrieve, memory, persistence) = engine();
        for d in ["1", "2"] {
            let composite = compose("p", d, "");
            let record = Record::new(json!(d), Some(10), true);
            memory.put(composite.clone(), record.clone()).await;
            persistence.seed(&composite, record);
        }
        tokio::time::sleep(Duration::from_millis(30)).await;

        let stale = retrieve.retrieve("p", "1", "", true, Some(10), false).await.unwrap();
        assert_eq!(stale.data(), &json!("1"));
        assert!(stale.is_expired());

        // Only the "1" family was evicted
        assert!(!persistence.contains(&compose("p", "1", "")));
        assert!(persistence.contains(&compose("p", "2", "")));
        assert!(retrieve.retrieve("p", "2", "", false, Some(10), false).await.is_none());
    }

    #[tokio::test]
    async fn test_expiry_without_dynamic_key_evicts_provider_family() {
        let (retrieve, memory, _) = engine();
        memory
            .put(compose("p", "", ""), Record::new(json!(1), Some(5), true))
            .await;
        memory
            .put(compose("p", "7", "g"), Record::new(json!(2), None, true))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(retrieve.retrieve("p", "", "", false, Some(5), false).await.is_none());
        assert!(memory.is_empty().await);
    }
}
