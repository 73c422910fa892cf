//! Evict Engine Module
//!
//! Removes records from both tiers by exact key, by dynamic-key family or
//! by provider family, or wipes both tiers.
//!
//! Family matching enumerates the memory tier's keys only. Records that
//! live solely in persistence (never read into memory by this process) are
//! not reached by family eviction; `evict_all` and the persistence scans of
//! the background tasks are the only paths that cover them.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::key::{self, compose};
use crate::cache::MemoryTier;
use crate::persistence::Persistence;

// == Evict Record ==
/// Symmetric eviction over the memory and persistence tiers.
#[derive(Clone)]
pub struct EvictRecord {
    memory: Arc<MemoryTier>,
    persistence: Arc<dyn Persistence>,
}

impl EvictRecord {
    pub fn new(memory: Arc<MemoryTier>, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            memory,
            persistence,
        }
    }

    // == Evict Key ==
    /// Removes one composite key from both tiers.
    ///
    /// Persistence failures are logged and swallowed.
    pub async fn evict_key(&self, composite: &str) {
        self.memory.evict(composite).await;
        if let Err(e) = self.persistence.evict(composite).await {
            warn!("Failed to evict {} from persistence: {}", composite, e);
        }
    }

    /// Removes every memory-resident record of `provider_key`.
    pub async fn evict_provider_family(&self, provider_key: &str) {
        let family = key::family_by_provider(provider_key);
        let matching: Vec<String> = self
            .memory
            .keys()
            .await
            .into_iter()
            .filter(|k| family.matches(k))
            .collect();

        debug!(
            "Evicting {} records of provider {}",
            matching.len(),
            provider_key
        );
        for composite in matching {
            self.evict_key(&composite).await;
        }
    }

    /// Removes every memory-resident group under `(provider_key, dynamic_key)`.
    pub async fn evict_dynamic_key_family(&self, provider_key: &str, dynamic_key: &str) {
        let family = key::family_by_provider_and_dynamic_key(provider_key, dynamic_key);
        let matching: Vec<String> = self
            .memory
            .keys()
            .await
            .into_iter()
            .filter(|k| family.matches(k))
            .collect();

        debug!(
            "Evicting {} records of provider {} dynamic key {}",
            matching.len(),
            provider_key,
            dynamic_key
        );
        for composite in matching {
            self.evict_key(&composite).await;
        }
    }

    /// Removes exactly one group from both tiers, resident in memory or not.
    pub async fn evict_exact_group(
        &self,
        provider_key: &str,
        dynamic_key: &str,
        dynamic_key_group: &str,
    ) {
        self.evict_key(&compose(provider_key, dynamic_key, dynamic_key_group))
            .await;
    }

    /// Wipes both tiers.
    pub async fn evict_all(&self) {
        self.memory.evict_all().await;
        if let Err(e) = self.persistence.evict_all().await {
            warn!("Failed to wipe persistence: {}", e);
        }
    }
}
