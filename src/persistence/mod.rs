//! Persistence Module
//!
//! Durable key to record storage consumed by the cache engines, plus the
//! file-backed [`Disk`] implementation.

mod disk;

pub use disk::Disk;

use async_trait::async_trait;

use crate::cache::StoredRecord;
use crate::error::Result;

// == Persistence ==
/// Byte-oriented durable storage keyed by composite key.
///
/// Used as `Arc<dyn Persistence>`.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Writes `record` under `key`, replacing any previous record.
    ///
    /// I/O failures are returned to the caller.
    async fn save(
        &self,
        key: &str,
        record: &StoredRecord,
        encrypted: bool,
        encrypt_key: Option<&str>,
    ) -> Result<()>;

    /// Removes the record under `key`. Absent keys are not an error.
    async fn evict(&self, key: &str) -> Result<()>;

    /// Removes every record.
    async fn evict_all(&self) -> Result<()>;

    /// Snapshot of all stored keys, stable for a single pass.
    async fn all_keys(&self) -> Vec<String>;

    /// Aggregate stored size in megabytes, rounded up.
    async fn stored_mb(&self) -> u64;

    /// Reads the record under `key` with `size_on_disk_mb` filled in.
    ///
    /// Returns `None` when the key is absent or the record cannot be decoded.
    async fn retrieve_record(
        &self,
        key: &str,
        encrypted: bool,
        encrypt_key: Option<&str>,
    ) -> Option<StoredRecord>;
}
