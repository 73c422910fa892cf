//! In-memory persistence double for unit tests.
//!
//! Every record accounts for the same fixed size, which keeps the size
//! evictor arithmetic exact.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cache::StoredRecord;
use crate::error::Result;
use crate::persistence::Persistence;

#[derive(Debug)]
pub struct MockPersistence {
    records: Mutex<BTreeMap<String, StoredRecord>>,
    record_size_mb: f64,
    fail_saves: AtomicBool,
    scans: AtomicUsize,
}

impl MockPersistence {
    pub fn new(record_size_mb: f64) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            record_size_mb,
            fail_saves: AtomicBool::new(false),
            scans: AtomicUsize::new(0),
        }
    }

    /// Makes every later `save` fail with an I/O error.
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// Number of `all_keys` calls so far.
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.lock().contains_key(key)
    }

    /// Inserts a record as if an earlier process had persisted it.
    pub fn seed(&self, key: &str, record: StoredRecord) {
        self.records.lock().insert(key.to_string(), record);
    }
}

#[async_trait]
impl Persistence for MockPersistence {
    async fn save(
        &self,
        key: &str,
        record: &StoredRecord,
        _encrypted: bool,
        _encrypt_key: Option<&str>,
    ) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk unavailable").into());
        }
        self.records.lock().insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<()> {
        self.records.lock().remove(key);
        Ok(())
    }

    async fn evict_all(&self) -> Result<()> {
        self.records.lock().clear();
        Ok(())
    }

    async fn all_keys(&self) -> Vec<String> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.records.lock().keys().cloned().collect()
    }

    async fn stored_mb(&self) -> u64 {
        (self.records.lock().len() as f64 * self.record_size_mb).ceil() as u64
    }

    async fn retrieve_record(
        &self,
        key: &str,
        _encrypted: bool,
        _encrypt_key: Option<&str>,
    ) -> Option<StoredRecord> {
        let mut record = self.records.lock().get(key).cloned()?;
        record.set_size_on_disk_mb(self.record_size_mb);
        Some(record)
    }
}
