//! Storage layer for EtherVault.
//!
//! This module provides a partitioned key-value backend abstraction with
//! in-memory and file-backed implementations, plus the typed stores built
//! on top of it: the credential registry (zero-or-one descriptor) and the
//! key record store (append-only encrypted records).
//!
//! # Design Principles
//! - Backend isolation: no persistence-specific logic in vault or crypto modules
//! - Async operations: all I/O operations are async
//! - Durability: a write commits before the operation reports success
//! - Opaque values: backends never interpret record contents

pub mod backend;
pub mod credentials;
pub mod file;
pub mod memory;
pub mod records;

pub use backend::{StorageBackend, CREDENTIALS_PARTITION, KEYS_PARTITION};
pub use credentials::{
    CredentialMethod, CredentialRecord, CredentialRegistry, MethodKind, CREDENTIAL_KEY,
};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use records::{KeyRecord, KeyRecordStore, NewKeyRecord};
