//! Cryptographic primitives for EtherVault.
//!
//! This module provides:
//! - Wallet key derivation: HKDF-SHA256 over PRF assertion outputs and
//!   PBKDF2-HMAC-SHA256 over passwords
//! - Authenticated encryption of private keys using AES-256-GCM
//! - Secure key management with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Decryption failures carry no detail about key or plaintext

pub mod cipher;
pub mod kdf;
pub mod keys;

pub use cipher::{decrypt, encrypt, Sealed, IV_SIZE};
pub use kdf::{derive_from_password, derive_from_prf, PBKDF2_ITERATIONS, PRF_EVAL_SALT};
pub use keys::{PrfOutput, Salt, VaultKey, PRF_OUTPUT_LENGTH, SALT_LENGTH};
