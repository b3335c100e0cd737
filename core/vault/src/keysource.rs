//! EVM key generation and address derivation.
//!
//! Session logic depends on the [`KeyMaterial`] trait rather than a
//! signing library, so tests can substitute fixed keys and the signer
//! stack stays confined to [`LocalKeyMaterial`].

use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;

use ethervault_common::{Address, Error, PrivateKeyHex, Result};

/// A freshly generated private key with its derived address.
#[derive(Debug)]
pub struct GeneratedKey {
    pub key: PrivateKeyHex,
    pub address: Address,
}

/// Source of EVM key material.
pub trait KeyMaterial: Send + Sync {
    /// Generate a random private key and derive its account address.
    fn generate(&self) -> Result<GeneratedKey>;

    /// Derive the account address of an existing private key.
    ///
    /// # Errors
    /// Returns `Error::Validation` if the key is hex-shaped but not a
    /// usable secp256k1 scalar. The message never contains the key.
    fn address_of(&self, key: &PrivateKeyHex) -> Result<Address>;
}

/// Key material backed by an in-process secp256k1 signer.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalKeyMaterial;

impl LocalKeyMaterial {
    pub fn new() -> Self {
        Self
    }
}

impl KeyMaterial for LocalKeyMaterial {
    fn generate(&self) -> Result<GeneratedKey> {
        let signer = PrivateKeySigner::random();
        let key = PrivateKeyHex::parse(&hex::encode(signer.to_bytes()))?;
        let address = Address::new(signer.address().to_string())?;
        Ok(GeneratedKey { key, address })
    }

    fn address_of(&self, key: &PrivateKeyHex) -> Result<Address> {
        let bytes = key.to_bytes()?;
        let signer = PrivateKeySigner::from_bytes(&B256::from(bytes)).map_err(|_| {
            Error::Validation("Private key is not a valid secp256k1 scalar".to_string())
        })?;
        Address::new(signer.address().to_string())
    }
}
