//! Two-Layer Cache Module
//!
//! Facade composing the retrieve, save and evict engines over one memory
//! tier and one persistence backend. Every operation first awaits the
//! startup expired-record sweep.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::{EvictRecord, MemoryTier, Record, RetrieveRecord, SaveRecord, StoredRecord};
use crate::config::Config;
use crate::error::Result;
use crate::persistence::Persistence;
use crate::tasks::{spawn_expired_sweep, SizeEvictor, StartupBarrier, SweepHandle};

// == Two Layers Cache ==
/// Memory + persistence cache shared by every provider of one instance.
#[derive(Clone)]
pub struct TwoLayersCache {
    ready: StartupBarrier,
    memory: Arc<MemoryTier>,
    retrieve: RetrieveRecord,
    save: SaveRecord,
    evict: EvictRecord,
    size_evictor: SizeEvictor,
}

impl TwoLayersCache {
    // == Constructor ==
    /// Builds the cache and spawns the startup sweep over `persistence`.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(persistence: Arc<dyn Persistence>, config: &Config) -> Self {
        let memory = Arc::new(MemoryTier::new());
        let encrypt_key = config.encrypt_key.clone();
        let evict = EvictRecord::new(memory.clone(), persistence.clone());
        let size_evictor = SizeEvictor::new(
            persistence.clone(),
            evict.clone(),
            config.max_mb_persistence,
            encrypt_key.clone(),
        );
        let retrieve = RetrieveRecord::new(
            memory.clone(),
            persistence.clone(),
            evict.clone(),
            encrypt_key.clone(),
        );
        let save = SaveRecord::new(
            memory.clone(),
            persistence.clone(),
            size_evictor.clone(),
            config.max_mb_persistence,
            encrypt_key.clone(),
        );
        let ready = spawn_expired_sweep(persistence, encrypt_key);

        Self {
            ready,
            memory,
            retrieve,
            save,
            evict,
            size_evictor,
        }
    }

    /// Resolves once the startup sweep has finished.
    pub async fn ready(&self) {
        self.ready.clone().await;
    }

    // == Retrieve ==
    /// See [`RetrieveRecord::retrieve`].
    pub async fn retrieve(
        &self,
        provider_key: &str,
        dynamic_key: &str,
        dynamic_key_group: &str,
        use_expired_if_unavailable: bool,
        life_time_ms: Option<u64>,
        encrypted: bool,
    ) -> Option<StoredRecord> {
        self.ready().await;
        self.retrieve
            .retrieve(
                provider_key,
                dynamic_key,
                dynamic_key_group,
                use_expired_if_unavailable,
                life_time_ms,
                encrypted,
            )
            .await
    }

    // == Save ==
    /// Encodes `data` into a new record and saves it into both tiers.
    ///
    /// The size evictor is triggered in the background; see
    /// [`TwoLayersCache::start_size_eviction`] to await a sweep.
    #[allow(clippy::too_many_arguments)]
    pub async fn save<T: Serialize>(
        &self,
        provider_key: &str,
        dynamic_key: &str,
        dynamic_key_group: &str,
        data: &T,
        life_time_ms: Option<u64>,
        expirable: bool,
        encrypted: bool,
    ) -> Result<()> {
        self.ready().await;
        let record = Record::from_payload(data, life_time_ms, expirable)?;
        self.save
            .save(provider_key, dynamic_key, dynamic_key_group, record, encrypted)
            .await
            .map(drop)
    }

    // == Evict ==
    pub async fn evict_provider_key(&self, provider_key: &str) {
        self.ready().await;
        self.evict.evict_provider_family(provider_key).await;
    }

    pub async fn evict_dynamic_key(&self, provider_key: &str, dynamic_key: &str) {
        self.ready().await;
        self.evict
            .evict_dynamic_key_family(provider_key, dynamic_key)
            .await;
    }

    pub async fn evict_dynamic_key_group(
        &self,
        provider_key: &str,
        dynamic_key: &str,
        dynamic_key_group: &str,
    ) {
        self.ready().await;
        self.evict
            .evict_exact_group(provider_key, dynamic_key, dynamic_key_group)
            .await;
    }

    pub async fn evict_all(&self) {
        self.ready().await;
        self.evict.evict_all().await;
    }

    /// Triggers the size evictor and returns the handle of its sweep.
    pub async fn start_size_eviction(&self, encrypted: bool) -> SweepHandle {
        self.ready().await;
        self.size_evictor.start_if_needed(encrypted)
    }

    /// Drops every memory-resident record, as a process restart would.
    /// Persistence is left untouched.
    pub async fn clear_memory(&self) {
        self.ready().await;
        self.memory.evict_all().await;
    }
}
