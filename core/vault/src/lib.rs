//! Vault engine for EtherVault.
//!
//! This module provides:
//! - The wallet state machine: setup, unlock, lock, and key management
//! - The platform authenticator abstraction and its software
//!   implementation
//! - EVM key generation and address derivation
//!
//! # Architecture
//! The vault module sits between hosts (CLI, embedders) and the crypto
//! and storage layers. Hosts drive a [`VaultSession`]; everything below
//! it only ever sees ciphertext or derived keys.

pub mod authenticator;
pub mod keysource;
pub mod session;

pub use authenticator::{CreatedCredential, PlatformAuthenticator, PrfRequest, SoftAuthenticator};
pub use keysource::{GeneratedKey, KeyMaterial, LocalKeyMaterial};
pub use session::{DecryptedKeyEntry, VaultSession, VaultState, MIN_PASSWORD_LENGTH};
