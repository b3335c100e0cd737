//! Storage backend trait definition.

use async_trait::async_trait;

use ethervault_common::Result;

/// Partition holding the singleton credential descriptor.
pub const CREDENTIALS_PARTITION: &str = "credentials";

/// Partition holding encrypted key records.
pub const KEYS_PARTITION: &str = "keys";

/// Partitioned key-value backend for vault records.
///
/// Two partitions exist: `credentials` (zero or one descriptor under a
/// fixed key) and `keys` (many records under backend-allocated integer
/// keys). Values are opaque bytes; callers handle serialization.
///
/// Implementations must commit a write durably before returning `Ok`,
/// and `get_all` must preserve insertion order, with an overwrite of an
/// existing key keeping its position.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get the backend name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Store a value under a key, overwriting any existing value.
    async fn put(&self, partition: &str, key: &str, value: Vec<u8>) -> Result<()>;

    /// Fetch a value by key.
    async fn get(&self, partition: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Fetch every value in the partition, in insertion order.
    async fn get_all(&self, partition: &str) -> Result<Vec<Vec<u8>>>;

    /// Remove a value by key.
    ///
    /// # Errors
    /// - Key not present
    async fn delete(&self, partition: &str, key: &str) -> Result<()>;

    /// Allocate the next record ID for the partition.
    ///
    /// IDs start at 1, are strictly increasing, and are never reused,
    /// including after deletes.
    async fn allocate_id(&self, partition: &str) -> Result<u64>;
}
