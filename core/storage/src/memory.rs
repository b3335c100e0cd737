//! In-memory storage backend for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::backend::StorageBackend;
use ethervault_common::{Error, Result};

/// In-memory state of one partition.
#[derive(Debug, Default)]
struct Partition {
    next_id: u64,
    entries: Vec<(String, Vec<u8>)>,
}

/// In-memory storage backend.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop.
pub struct MemoryBackend {
    partitions: Arc<RwLock<HashMap<String, Partition>>>,
}

impl MemoryBackend {
    /// Create a new empty memory backend.
    pub fn new() -> Self {
        Self {
            partitions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, partition: &str, key: &str, value: Vec<u8>) -> Result<()> {
        let mut partitions = self.partitions.write().unwrap();
        let part = partitions.entry(partition.to_string()).or_default();

        match part.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => part.entries.push((key.to_string(), value)),
        }

        Ok(())
    }

    async fn get(&self, partition: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let partitions = self.partitions.read().unwrap();

        Ok(partitions.get(partition).and_then(|part| {
            part.entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }))
    }

    async fn get_all(&self, partition: &str) -> Result<Vec<Vec<u8>>> {
        let partitions = self.partitions.read().unwrap();

        Ok(partitions
            .get(partition)
            .map(|part| part.entries.iter().map(|(_, v)| v.clone()).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<()> {
        let mut partitions = self.partitions.write().unwrap();
        let part = partitions
            .get_mut(partition)
            .ok_or_else(|| Error::NotFound(format!("No such record: {}/{}", partition, key)))?;

        match part.entries.iter().position(|(k, _)| k == key) {
            Some(index) => {
                part.entries.remove(index);
                Ok(())
            }
            None => Err(Error::NotFound(format!(
                "No such record: {}/{}",
                partition, key
            ))),
        }
    }

    async fn allocate_id(&self, partition: &str) -> Result<u64> {
        let mut partitions = self.partitions.write().unwrap();
        let part = partitions.entry(partition.to_string()).or_default();

        part.next_id += 1;
        Ok(part.next_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let backend = MemoryBackend::new();

        backend.put("keys", "1", vec![1, 2, 3]).await.unwrap();
        let value = backend.get("keys", "1").await.unwrap();

        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("keys", "42").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_all_preserves_insertion_order() {
        let backend = MemoryBackend::new();

        backend.put("keys", "1", vec![1]).await.unwrap();
        backend.put("keys", "2", vec![2]).await.unwrap();
        backend.put("keys", "3", vec![3]).await.unwrap();
        // Overwrite keeps the original position.
        backend.put("keys", "1", vec![9]).await.unwrap();

        let all = backend.get_all("keys").await.unwrap();
        assert_eq!(all, vec![vec![9], vec![2], vec![3]]);
    }

    #[tokio::test]
    async fn test_get_all_empty_partition() {
        let backend = MemoryBackend::new();
        assert!(backend.get_all("keys").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MemoryBackend::new();

        backend.put("keys", "1", vec![1]).await.unwrap();
        backend.delete("keys", "1").await.unwrap();

        assert_eq!(backend.get("keys", "1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_fails() {
        let backend = MemoryBackend::new();
        backend.put("keys", "1", vec![1]).await.unwrap();

        assert!(matches!(
            backend.delete("keys", "42").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_allocate_id_monotonic() {
        let backend = MemoryBackend::new();

        assert_eq!(backend.allocate_id("keys").await.unwrap(), 1);
        assert_eq!(backend.allocate_id("keys").await.unwrap(), 2);

        // IDs are not reused after a delete.
        backend.put("keys", "2", vec![2]).await.unwrap();
        backend.delete("keys", "2").await.unwrap();
        assert_eq!(backend.allocate_id("keys").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_partitions_are_independent() {
        let backend = MemoryBackend::new();

        backend.put("credentials", "primary", vec![1]).await.unwrap();
        backend.allocate_id("keys").await.unwrap();

        assert!(backend.get_all("keys").await.unwrap().is_empty());
        assert_eq!(backend.allocate_id("credentials").await.unwrap(), 1);
    }
}
