//! Common error types for EtherVault.

use thiserror::Error;

/// Top-level error type for EtherVault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Authenticated decryption failed.
    ///
    /// Deliberately carries no detail: the cause is either a wrong
    /// credential or a corrupted record, and nothing about the key or
    /// plaintext may leak through the error path.
    #[error("Decryption failed: wrong credential or corrupted record")]
    Decryption,

    /// No platform authenticator is available, or it does not support
    /// the PRF extension.
    #[error("Authenticator capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// The user dismissed the authenticator prompt, or it timed out.
    #[error("Authenticator prompt was cancelled or timed out")]
    UserCancelled,

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Operation is not valid in the current vault state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or RPC failure.
    #[error("Network error: {0}")]
    Network(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
