//! Expired-Record Sweep
//!
//! One-shot startup task that deletes every persisted record whose life
//! time has elapsed. The cache facade awaits its [`StartupBarrier`] before
//! serving any operation.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info};

use crate::cache::current_timestamp_ms;
use crate::persistence::Persistence;

/// Completion signal of the startup sweep, awaited by every cache operation.
pub type StartupBarrier = Shared<BoxFuture<'static, ()>>;

/// Evicts expired records from persistence and returns their keys.
///
/// Only records with a positive life time can expire here; the memory tier
/// is not touched and no family cascade happens. Records that do not decode
/// in plain form are retried as encrypted when an encryption key is set.
pub async fn evict_expired_records(
    persistence: &dyn Persistence,
    encrypt_key: Option<&str>,
) -> Vec<String> {
    let now = current_timestamp_ms();
    let mut evicted = Vec::new();

    for key in persistence.all_keys().await {
        let mut record = persistence.retrieve_record(&key, false, encrypt_key).await;
        if record.is_none() && encrypt_key.is_some() {
            record = persistence.retrieve_record(&key, true, encrypt_key).await;
        }

        let expired = record
            .and_then(|r| r.expires_at_ms())
            .is_some_and(|expires_at| expires_at < now);
        if !expired {
            continue;
        }

        match persistence.evict(&key).await {
            Ok(()) => {
                debug!("Evicted expired record {}", key);
                evicted.push(key);
            }
            Err(e) => error!("Failed to evict expired record {}: {}", key, e),
        }
    }

    evicted
}

/// Spawns the startup sweep and returns the barrier that resolves once it
/// has finished. Must be called within a tokio runtime.
///
/// # Example
/// ```ignore
/// let barrier = spawn_expired_sweep(persistence.clone(), None);
/// barrier.clone().await; // every later await returns immediately
/// ```
pub fn spawn_expired_sweep(
    persistence: Arc<dyn Persistence>,
    encrypt_key: Option<String>,
) -> StartupBarrier {
    let task = tokio::spawn(async move {
        let evicted = evict_expired_records(persistence.as_ref(), encrypt_key.as_deref()).await;
        info!("Expired sweep: removed {} expired records", evicted.len());
    });

    async move {
        if let Err(e) = task.await {
            error!("Expired sweep task failed: {}", e);
        }
    }
    .boxed()
    .shared()
}
