//! Encrypted key record persistence.
//!
//! A key record carries everything about a stored key except its
//! plaintext: label, address, ciphertext and IV. Records are append-only
//! with backend-assigned monotonic IDs; listing follows insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backend::{StorageBackend, KEYS_PARTITION};
use ethervault_common::{Address, Error, Result};
use ethervault_crypto::IV_SIZE;

/// A stored key: everything about it except the plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Backend-assigned record ID, unique and monotonic.
    pub id: u64,
    /// User-facing label.
    pub label: String,
    /// Public account address of the key.
    pub address: Address,
    /// AES-256-GCM ciphertext of the private key hex string.
    pub ciphertext: Vec<u8>,
    /// IV the ciphertext was produced under.
    pub iv: [u8; IV_SIZE],
    /// When the key was stored.
    pub created_at: DateTime<Utc>,
}

/// A key record before the backend has assigned its ID.
#[derive(Debug, Clone)]
pub struct NewKeyRecord {
    pub label: String,
    pub address: Address,
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_SIZE],
}

/// Append-only store of encrypted key records.
///
/// Plaintext private keys never pass through this type; only their
/// ciphertexts do.
pub struct KeyRecordStore {
    backend: Arc<dyn StorageBackend>,
}

impl KeyRecordStore {
    /// Create a store over the given backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Persist a new record, assigning the next ID.
    ///
    /// # Postconditions
    /// - The returned record carries its assigned ID and timestamp
    /// - The write is durably committed
    pub async fn add(&self, record: NewKeyRecord) -> Result<KeyRecord> {
        let id = self.backend.allocate_id(KEYS_PARTITION).await?;

        let record = KeyRecord {
            id,
            label: record.label,
            address: record.address,
            ciphertext: record.ciphertext,
            iv: record.iv,
            created_at: Utc::now(),
        };

        let bytes =
            serde_json::to_vec(&record).map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend
            .put(KEYS_PARTITION, &id.to_string(), bytes)
            .await?;

        Ok(record)
    }

    /// All records, in insertion order.
    pub async fn list(&self) -> Result<Vec<KeyRecord>> {
        let mut records = Vec::new();
        for bytes in self.backend.get_all(KEYS_PARTITION).await? {
            let record = serde_json::from_slice(&bytes)
                .map_err(|e| Error::Serialization(format!("Corrupt key record: {}", e)))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Fetch one record by ID.
    pub async fn get(&self, id: u64) -> Result<Option<KeyRecord>> {
        match self.backend.get(KEYS_PARTITION, &id.to_string()).await? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::Serialization(format!("Corrupt key record: {}", e)))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Change a record's label, leaving every other field untouched.
    ///
    /// # Errors
    /// - No record with that ID
    pub async fn update_label(&self, id: u64, label: &str) -> Result<()> {
        let mut record = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No key record with id {}", id)))?;

        record.label = label.to_string();

        let bytes =
            serde_json::to_vec(&record).map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend
            .put(KEYS_PARTITION, &id.to_string(), bytes)
            .await
    }

    /// Remove a record.
    ///
    /// Present for storage completeness; no vault operation exposes it.
    pub async fn delete(&self, id: u64) -> Result<()> {
        self.backend.delete(KEYS_PARTITION, &id.to_string()).await
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.backend.get_all(KEYS_PARTITION).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn store() -> KeyRecordStore {
        KeyRecordStore::new(Arc::new(MemoryBackend::new()))
    }

    fn sample(label: &str) -> NewKeyRecord {
        NewKeyRecord {
            label: label.to_string(),
            address: Address::new(format!("0x{}", "ab".repeat(20))).unwrap(),
            ciphertext: vec![0xde, 0xad, 0xbe, 0xef],
            iv: [7u8; IV_SIZE],
        }
    }

    #[tokio::test]
    async fn test_add_assigns_sequential_ids() {
        let store = store();

        let first = store.add(sample("one")).await.unwrap();
        let second = store.add(sample("two")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let store = store();

        store.add(sample("one")).await.unwrap();
        store.add(sample("two")).await.unwrap();
        store.add(sample("three")).await.unwrap();

        let labels: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(labels, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_update_label_preserves_other_fields() {
        let store = store();
        let record = store.add(sample("before")).await.unwrap();

        store.update_label(record.id, "after").await.unwrap();

        let updated = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(updated.label, "after");
        assert_eq!(updated.ciphertext, record.ciphertext);
        assert_eq!(updated.iv, record.iv);
        assert_eq!(updated.address, record.address);
        assert_eq!(updated.created_at, record.created_at);
    }

    #[tokio::test]
    async fn test_update_label_missing_id_fails() {
        let store = store();

        assert!(matches!(
            store.update_label(42, "anything").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ids_continue_after_delete() {
        let store = store();

        let first = store.add(sample("one")).await.unwrap();
        store.delete(first.id).await.unwrap();

        let second = store.add(sample("two")).await.unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
