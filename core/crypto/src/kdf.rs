//! Wallet key derivation.
//!
//! Two derivation paths produce the same kind of 256-bit AES key: HKDF-SHA256
//! over a PRF assertion output (biometric credentials), and
//! PBKDF2-HMAC-SHA256 over a password. Both are deterministic for fixed
//! inputs, which is what makes re-unlocking possible.

use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::keys::{PrfOutput, Salt, VaultKey, KEY_LENGTH};
use ethervault_common::{Error, Result};

/// PRF evaluation input, reused as the HKDF extract salt.
///
/// Persisted-data contract: changing this value makes every previously
/// written ciphertext undecryptable.
pub const PRF_EVAL_SALT: &[u8] = b"wallet-encryption-v1";

/// HKDF expand info for the wallet encryption key.
///
/// Persisted-data contract, same as [`PRF_EVAL_SALT`].
pub const HKDF_INFO: &[u8] = b"AES-GCM Wallet Encryption Key V1";

/// PBKDF2 iteration count for password-derived keys.
///
/// Persisted-data contract, same as [`PRF_EVAL_SALT`].
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Derive the wallet key from a PRF assertion output using HKDF-SHA256.
///
/// # Postconditions
/// - The derived key is deterministic given the same PRF output
///
/// # Errors
/// - Returns error if HKDF expansion fails
///
/// # Security
/// - The PRF output is not stored or logged
pub fn derive_from_prf(prf: &PrfOutput) -> Result<VaultKey> {
    let hk = Hkdf::<Sha256>::new(Some(PRF_EVAL_SALT), prf.as_bytes());

    let mut key_bytes = [0u8; KEY_LENGTH];
    hk.expand(HKDF_INFO, &mut key_bytes)
        .map_err(|e| Error::Crypto(format!("HKDF expansion failed: {}", e)))?;

    Ok(VaultKey::from_bytes(key_bytes))
}

/// Derive the wallet key from a password and salt using PBKDF2-HMAC-SHA256.
///
/// # Preconditions
/// - `password` must not be empty
///
/// # Postconditions
/// - The derived key is deterministic given the same password and salt
///
/// # Errors
/// - Returns error if password is empty
///
/// # Security
/// - Password is not stored or logged
/// - 600k iterations make offline guessing expensive
pub fn derive_from_password(password: &str, salt: &Salt) -> Result<VaultKey> {
    if password.is_empty() {
        return Err(Error::Validation("Password cannot be empty".to_string()));
    }

    let mut key_bytes = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut key_bytes,
    );

    Ok(VaultKey::from_bytes(key_bytes))
}
