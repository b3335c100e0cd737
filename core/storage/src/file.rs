//! File-backed storage backend.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::backend::StorageBackend;
use ethervault_common::{Error, Result};

/// One record inside a partition document.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    /// Base64-encoded value bytes.
    value: String,
}

/// On-disk shape of one partition.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PartitionDoc {
    next_id: u64,
    entries: Vec<StoredEntry>,
}

/// File-backed storage backend.
///
/// Each partition lives in one JSON document under the root directory
/// (`<root>/<partition>.json`). The whole document is rewritten on every
/// mutation, and the write completes before the operation reports
/// success. A missing document reads as an empty partition.
pub struct FileBackend {
    root: PathBuf,
    // Serializes read-modify-write cycles on the partition documents.
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Create a new file backend rooted at the given directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Invalid path
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn partition_path(&self, partition: &str) -> PathBuf {
        self.root.join(format!("{}.json", partition))
    }

    async fn load(&self, partition: &str) -> Result<PartitionDoc> {
        let path = self.partition_path(partition);

        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Serialization(format!("Corrupt partition document {}: {}", partition, e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PartitionDoc::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, partition: &str, doc: &PartitionDoc) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(doc).map_err(|e| Error::Serialization(e.to_string()))?;
        let path = self.partition_path(partition);
        fs::write(&path, json).await?;

        debug!(path = %path.display(), "Partition document written");
        Ok(())
    }

    fn decode_value(partition: &str, entry: &StoredEntry) -> Result<Vec<u8>> {
        general_purpose::STANDARD.decode(&entry.value).map_err(|e| {
            Error::Serialization(format!(
                "Corrupt value {}/{}: {}",
                partition, entry.key, e
            ))
        })
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn put(&self, partition: &str, key: &str, value: Vec<u8>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.load(partition).await?;
        let encoded = general_purpose::STANDARD.encode(&value);

        match doc.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = encoded,
            None => doc.entries.push(StoredEntry {
                key: key.to_string(),
                value: encoded,
            }),
        }

        self.save(partition, &doc).await
    }

    async fn get(&self, partition: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let doc = self.load(partition).await?;

        match doc.entries.iter().find(|e| e.key == key) {
            Some(entry) => Ok(Some(Self::decode_value(partition, entry)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self, partition: &str) -> Result<Vec<Vec<u8>>> {
        let doc = self.load(partition).await?;

        doc.entries
            .iter()
            .map(|entry| Self::decode_value(partition, entry))
            .collect()
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.load(partition).await?;
        match doc.entries.iter().position(|e| e.key == key) {
            Some(index) => {
                doc.entries.remove(index);
                self.save(partition, &doc).await
            }
            None => Err(Error::NotFound(format!(
                "No such record: {}/{}",
                partition, key
            ))),
        }
    }

    async fn allocate_id(&self, partition: &str) -> Result<u64> {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.load(partition).await?;
        doc.next_id += 1;
        let id = doc.next_id;
        self.save(partition, &doc).await?;

        Ok(id)
    }
}
