//! Disk Persistence
//!
//! Stores each record as a JSON file in one directory. File names are the
//! hex-encoded SHA-256 digest of the composite key, so key length and key
//! characters never reach the file system. The key itself travels inside
//! the file next to the record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::StoredRecord;
use crate::error::{CacheError, Result};
use crate::persistence::Persistence;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Suffix of files being written; never reported as keys.
const PARTIAL_SUFFIX: &str = ".partial";

/// Length of a hex-encoded SHA-256 digest.
const FILE_NAME_LEN: usize = 64;

// == Envelope ==
#[derive(Serialize)]
struct EnvelopeRef<'a> {
    key: &'a str,
    record: &'a StoredRecord,
}

#[derive(Deserialize)]
struct Envelope {
    key: String,
    record: StoredRecord,
}

/// Reads the key of a file without decoding its record.
#[derive(Deserialize)]
struct EnvelopeKey {
    key: String,
}

// == Disk ==
/// File-per-record persistence rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct Disk {
    directory: PathBuf,
}

impl Disk {
    // == Constructor ==
    /// Opens (creating if needed) the cache directory.
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name holding the record stored under `key`.
    pub fn file_name_for(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(Self::file_name_for(key))
    }

    fn is_record_file(file_name: &str) -> bool {
        file_name.len() == FILE_NAME_LEN && file_name.bytes().all(|b| b.is_ascii_hexdigit())
    }

    async fn record_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list cache directory {:?}: {}", self.directory, e);
                return files;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name();
                    if name.to_str().is_some_and(Self::is_record_file) {
                        files.push(entry.path());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopped listing cache directory {:?}: {}", self.directory, e);
                    break;
                }
            }
        }
        files
    }
}

#[async_trait]
impl Persistence for Disk {
    async fn save(
        &self,
        key: &str,
        record: &StoredRecord,
        encrypted: bool,
        _encrypt_key: Option<&str>,
    ) -> Result<()> {
        if encrypted {
            return Err(CacheError::EncryptionUnsupported(key.to_string()));
        }

        let bytes = serde_json::to_vec(&EnvelopeRef { key, record })?;
        let path = self.path_for(key);
        let mut partial = path.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);

        // Write aside then rename so readers never observe a torn record
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &path).await?;
        debug!("Persisted {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn evict_all(&self) -> Result<()> {
        for path in self.record_files().await {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn all_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for path in self.record_files().await {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("Skipping unreadable cache file {:?}: {}", path, e);
                    continue;
                }
            };
            match serde_json::from_slice::<EnvelopeKey>(&bytes) {
                Ok(envelope) => keys.push(envelope.key),
                Err(e) => debug!("Skipping undecodable cache file {:?}: {}", path, e),
            }
        }
        keys
    }

    async fn stored_mb(&self) -> u64 {
        let mut bytes: u64 = 0;
        for path in self.record_files().await {
            if let Ok(metadata) = tokio::fs::metadata(&path).await {
                bytes += metadata.len();
            }
        }
        (bytes as f64 / BYTES_PER_MB).ceil() as u64
    }

    async fn retrieve_record(
        &self,
        key: &str,
        encrypted: bool,
        _encrypt_key: Option<&str>,
    ) -> Option<StoredRecord> {
        if encrypted {
            warn!("Encrypted record requested from plain disk persistence: {}", key);
            return None;
        }

        let bytes = tokio::fs::read(self.path_for(key)).await.ok()?;
        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Discarding undecodable record {}: {}", key, e);
                return None;
            }
        };
        if envelope.key != key {
            warn!("Cache file of {} holds the record of {}", key, envelope.key);
            return None;
        }

        let mut record = envelope.record;
        if !record.is_consistent() {
            debug!("Discarding record {} whose payload does not match its kind", key);
            return None;
        }

        record.set_size_on_disk_mb(bytes.len() as f64 / BYTES_PER_MB);
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{compose, Record};
    use serde_json::json;

    async fn disk() -> (tempfile::TempDir, Disk) {
        let dir = tempfile::tempdir().unwrap();
        let disk = Disk::open(dir.path()).await.unwrap();
        (dir, disk)
    }

    #[tokio::test]
    async fn test_save_and_retrieve() {
        let (_dir, disk) = disk().await;
        let key = compose("mocks", "1/2", "a b");
        let record = Record::new(json!([1, 2, 3]), Some(100), true);

        disk.save(&key, &record, false, None).await.unwrap();
        let back = disk.retrieve_record(&key, false, None).await.unwrap();

        assert_eq!(back.data(), record.data());
        assert_eq!(back.persisted_at_ms(), record.persisted_at_ms());
        assert!(back.is_expirable());
        assert!(back.size_on_disk_mb() > 0.0);
    }

    #[tokio::test]
    async fn test_all_keys_survive_special_characters() {
        let (_dir, disk) = disk().await;
        let keys = [compose("p", "", ""), compose("p/q", "1", "..")];
        for key in &keys {
            disk.save(key, &Record::new(json!(1), None, true), false, None)
                .await
                .unwrap();
        }

        let mut stored = disk.all_keys().await;
        stored.sort();
        let mut expected = keys.to_vec();
        expected.sort();
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn test_long_dynamic_key_round_trip() {
        let (dir, disk) = disk().await;
        let key = compose("mocks", &"q".repeat(200), "group");
        let record = Record::new(json!({"id": 1}), None, true);

        disk.save(&key, &record, false, None).await.unwrap();

        let back = disk.retrieve_record(&key, false, None).await.unwrap();
        assert_eq!(back.data(), record.data());
        assert_eq!(disk.all_keys().await, vec![key.clone()]);
        assert!(dir.path().join(Disk::file_name_for(&key)).exists());
        assert_eq!(Disk::file_name_for(&key).len(), FILE_NAME_LEN);
    }

    #[tokio::test]
    async fn test_foreign_files_are_ignored() {
        let (dir, disk) = disk().await;
        disk.save("k", &Record::new(json!(1), None, true), false, None)
            .await
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        let partial = format!("{}{}", Disk::file_name_for("other"), PARTIAL_SUFFIX);
        std::fs::write(dir.path().join(partial), b"{").unwrap();

        assert_eq!(disk.all_keys().await, vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_records_are_absent() {
        let (dir, disk) = disk().await;
        assert!(disk.retrieve_record("missing", false, None).await.is_none());

        std::fs::write(dir.path().join(Disk::file_name_for("broken")), b"{not json").unwrap();
        assert!(disk.retrieve_record("broken", false, None).await.is_none());
    }

    #[tokio::test]
    async fn test_evict_is_best_effort() {
        let (_dir, disk) = disk().await;
        disk.evict("missing").await.unwrap();

        disk.save("k", &Record::new(json!(1), None, true), false, None)
            .await
            .unwrap();
        disk.evict("k").await.unwrap();
        assert!(disk.all_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_evict_all() {
        let (_dir, disk) = disk().await;
        for i in 0..3 {
            disk.save(&format!("k{i}"), &Record::new(json!(i), None, true), false, None)
                .await
                .unwrap();
        }
        disk.evict_all().await.unwrap();
        assert!(disk.all_keys().await.is_empty());
        assert_eq!(disk.stored_mb().await, 0);
    }

    #[tokio::test]
    async fn test_stored_mb_rounds_up() {
        let (_dir, disk) = disk().await;
        assert_eq!(disk.stored_mb().await, 0);

        disk.save("small", &Record::new(json!("x"), None, true), false, None)
            .await
            .unwrap();
        assert_eq!(disk.stored_mb().await, 1);

        let big = "x".repeat(1024 * 1024);
        disk.save("big", &Record::new(json!(big), None, true), false, None)
            .await
            .unwrap();
        assert_eq!(disk.stored_mb().await, 2);
    }

    #[tokio::test]
    async fn test_encryption_rejected() {
        let (_dir, disk) = disk().await;
        let result = disk
            .save("k", &Record::new(json!(1), None, true), true, Some("secret"))
            .await;
        assert!(matches!(result, Err(CacheError::EncryptionUnsupported(_))));
        assert!(disk.retrieve_record("k", true, Some("secret")).await.is_none());
    }
}
