//! Save Engine Module
//!
//! Writes new records into both tiers and triggers the size evictor.

use std::sync::Arc;

use tracing::warn;

use crate::cache::{compose, MemoryTier, StoredRecord};
use crate::error::Result;
use crate::persistence::Persistence;
use crate::tasks::{SizeEvictor, SweepHandle};

// == Save Record ==
/// Write path: memory always, persistence while under the size limit.
#[derive(Clone)]
pub struct SaveRecord {
    memory: Arc<MemoryTier>,
    persistence: Arc<dyn Persistence>,
    size_evictor: SizeEvictor,
    max_mb: u64,
    encrypt_key: Option<String>,
}

impl SaveRecord {
    pub fn new(
        memory: Arc<MemoryTier>,
        persistence: Arc<dyn Persistence>,
        size_evictor: SizeEvictor,
        max_mb: u64,
        encrypt_key: Option<String>,
    ) -> Self {
        Self {
            memory,
            persistence,
            size_evictor,
            max_mb,
            encrypt_key,
        }
    }

    // == Save ==
    /// Stores `record` under the composed key.
    ///
    /// When persistence is already at or above its maximum size the record
    /// is kept in memory only. The size evictor is triggered on every call;
    /// its handle is returned so callers may await the sweep.
    ///
    /// # Errors
    /// Persistence write failures are returned after the evictor trigger.
    pub async fn save(
        &self,
        provider_key: &str,
        dynamic_key: &str,
        dynamic_key_group: &str,
        record: StoredRecord,
        encrypted: bool,
    ) -> Result<SweepHandle> {
        let composite = compose(provider_key, dynamic_key, dynamic_key_group);
        self.memory.put(composite.clone(), record.clone()).await;

        let stored_mb = self.persistence.stored_mb().await;
        let written = if stored_mb >= self.max_mb {
            warn!(
                "Record {} can not be persisted because persistence holds {} MB of {} MB",
                composite, stored_mb, self.max_mb
            );
            Ok(())
        } else {
            self.persistence
                .save(&composite, &record, encrypted, self.encrypt_key.as_deref())
                .await
        };

        let sweep = self.size_evictor.start_if_needed(encrypted);
        written.map(|()| sweep)
    }
}
