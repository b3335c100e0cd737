//! Common types used throughout EtherVault.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of an EVM private key in bytes.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// EVM account address as a `0x`-prefixed 40-hex-character string.
///
/// Casing is preserved exactly as the deriver produced it (EIP-55
/// checksummed for generated and imported keys).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create a new Address from a string.
    ///
    /// # Preconditions
    /// - `address` must be `0x` followed by exactly 40 hex characters
    ///
    /// # Errors
    /// - Returns error if the prefix or hex body is malformed
    pub fn new(address: impl Into<String>) -> crate::Result<Self> {
        let address = address.into();
        let body = address.strip_prefix("0x").ok_or_else(|| {
            crate::Error::Validation("Address must start with 0x".to_string())
        })?;
        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::Error::Validation(
                "Address must be 0x followed by 40 hex characters".to_string(),
            ));
        }
        Ok(Self(address))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A plaintext EVM private key, held as its normalized hex string form
/// (`0x` followed by 64 hex characters) and zeroized on drop.
///
/// Construction goes through [`PrivateKeyHex::parse`], so a value of this
/// type is always well-formed. The Debug impl never prints the key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyHex(String);

impl PrivateKeyHex {
    /// Parse and normalize raw private key input.
    ///
    /// Leading/trailing whitespace is trimmed and a missing `0x` prefix is
    /// added before validation, so both the 64- and 66-character forms are
    /// accepted.
    ///
    /// # Errors
    /// - Returns a validation error if the normalized form is not `0x`
    ///   followed by exactly 64 hex characters. The error never echoes
    ///   the rejected input.
    pub fn parse(input: &str) -> crate::Result<Self> {
        let trimmed = input.trim();
        let normalized = if trimmed.starts_with("0x") {
            trimmed.to_string()
        } else {
            format!("0x{}", trimmed)
        };

        let body = &normalized[2..];
        if body.len() != 64 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::Error::Validation(
                "Private key must be 64 hex characters (optionally 0x-prefixed)".to_string(),
            ));
        }
        Ok(Self(normalized))
    }

    /// Get the normalized `0x`-prefixed string.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the key into its 32 raw bytes.
    pub fn to_bytes(&self) -> crate::Result<[u8; PRIVATE_KEY_LENGTH]> {
        let mut bytes = [0u8; PRIVATE_KEY_LENGTH];
        hex::decode_to_slice(&self.0[2..], &mut bytes)
            .map_err(|_| crate::Error::Validation("Private key is not valid hex".to_string()))?;
        Ok(bytes)
    }
}

impl fmt::Debug for PrivateKeyHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKeyHex([REDACTED])")
    }
}
