//! Authenticated encryption for private-key plaintexts.
//!
//! AES-256-GCM with a fresh random 12-byte IV per encryption and no
//! additional authenticated data. The IV travels next to the ciphertext
//! in the persisted record rather than being prepended to it.

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, AeadCore, OsRng},
    Aes256Gcm, KeyInit, Nonce,
};
use zeroize::Zeroizing;

use crate::keys::VaultKey;
use ethervault_common::{Error, Result};

/// IV size for AES-256-GCM (12 bytes).
pub const IV_SIZE: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Ciphertext together with the IV it was produced under.
#[derive(Debug, Clone)]
pub struct Sealed {
    /// Encrypted bytes with the GCM tag appended.
    pub ciphertext: Vec<u8>,
    /// Initialization vector for this encryption.
    pub iv: [u8; IV_SIZE],
}

/// Encrypt plaintext under the wallet key.
///
/// # Postconditions
/// - The IV is freshly random; encrypting the same plaintext twice yields
///   different ciphertexts
/// - `ciphertext.len()` is `plaintext.len() + TAG_SIZE`
///
/// # Errors
/// - Returns error if encryption fails
pub fn encrypt(key: &VaultKey, plaintext: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let mut iv = [0u8; IV_SIZE];
    iv.copy_from_slice(&nonce);

    Ok(Sealed { ciphertext, iv })
}

/// Decrypt a stored ciphertext under the wallet key.
///
/// # Preconditions
/// - `ciphertext` must include the appended GCM tag
///
/// # Postconditions
/// - The tag is verified before any plaintext is returned
/// - The plaintext buffer zeroizes itself on drop
///
/// # Errors
/// - Returns [`Error::Decryption`] on tag mismatch, with no detail about
///   the key or plaintext
pub fn decrypt(key: &VaultKey, ciphertext: &[u8], iv: &[u8; IV_SIZE]) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::Decryption);
    }

    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
    let nonce = Nonce::from_slice(iv);

    let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|_| Error::Decryption)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_LENGTH;

    fn test_key(byte: u8) -> VaultKey {
        VaultKey::from_bytes([byte; KEY_LENGTH])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key(42);
        let plaintext = b"0x4c0883a69102937d6231471b5dbb6204fe512961708279f2e3e8a5d4b8e3e8a5";

        let sealed = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &sealed.ciphertext, &sealed.iv).unwrap();

        assert_eq!(&*decrypted, plaintext);
    }

    #[test]
    fn test_ciphertext_size() {
        let key = test_key(42);
        let plaintext = b"Test message";

        let sealed = encrypt(&key, plaintext).unwrap();

        assert_eq!(sealed.ciphertext.len(), plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn test_fresh_iv_each_time() {
        let key = test_key(42);
        let plaintext = b"Same plaintext";

        let s1 = encrypt(&key, plaintext).unwrap();
        let s2 = encrypt(&key, plaintext).unwrap();

        assert_ne!(s1.iv, s2.iv);
        assert_ne!(s1.ciphertext, s2.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = encrypt(&test_key(1), b"Secret data").unwrap();
        let result = decrypt(&test_key(2), &sealed.ciphertext, &sealed.iv);

        assert!(matches!(result, Err(Error::Decryption)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = test_key(42);
        let mut sealed = encrypt(&key, b"Important data").unwrap();
        sealed.ciphertext[5] ^= 0xFF;

        let result = decrypt(&key, &sealed.ciphertext, &sealed.iv);
        assert!(matches!(result, Err(Error::Decryption)));
    }

    #[test]
    fn test_tampered_iv_fails() {
        let key = test_key(42);
        let mut sealed = encrypt(&key, b"Important data").unwrap();
        sealed.iv[0] ^= 0xFF;

        let result = decrypt(&key, &sealed.ciphertext, &sealed.iv);
        assert!(matches!(result, Err(Error::Decryption)));
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let key = test_key(42);
        let sealed = encrypt(&key, b"data").unwrap();

        let result = decrypt(&key, &sealed.ciphertext[..TAG_SIZE - 1], &sealed.iv);
        assert!(matches!(result, Err(Error::Decryption)));
    }

    #[test]
    fn test_decryption_error_is_detail_free() {
        let sealed = encrypt(&test_key(1), b"super secret key material").unwrap();
        let err = decrypt(&test_key(2), &sealed.ciphertext, &sealed.iv).unwrap_err();

        let message = err.to_string();
        assert!(!message.contains("secret"));
    }
}
