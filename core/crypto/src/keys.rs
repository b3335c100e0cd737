//! Key types with secure memory handling.
//!
//! All key types automatically zeroize their memory on drop to prevent
//! sensitive data from persisting in memory.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the wallet encryption key in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of a PRF assertion output in bytes.
pub const PRF_OUTPUT_LENGTH: usize = 32;

/// Length of the password derivation salt in bytes.
pub const SALT_LENGTH: usize = 32;

/// Symmetric key protecting every stored private key.
///
/// Derived per unlock and held only by an unlocked session. The key is
/// never serialized and never appears in logs or errors.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    key: [u8; KEY_LENGTH],
}

impl VaultKey {
    /// Create a vault key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultKey([REDACTED])")
    }
}

/// Raw output of a PRF assertion (hmac-secret evaluation).
///
/// This is the authenticator-side secret the wallet key is derived from;
/// it gets the same memory hygiene as the key itself.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrfOutput {
    bytes: [u8; PRF_OUTPUT_LENGTH],
}

impl PrfOutput {
    /// Create a PRF output from raw bytes.
    pub fn from_bytes(bytes: [u8; PRF_OUTPUT_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Get the output bytes.
    pub fn as_bytes(&self) -> &[u8; PRF_OUTPUT_LENGTH] {
        &self.bytes
    }
}

impl fmt::Debug for PrfOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrfOutput([REDACTED])")
    }
}

/// Salt for password key derivation.
///
/// Generated once at password setup and persisted in the credential
/// record; not secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salt(pub [u8; SALT_LENGTH]);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }
}
