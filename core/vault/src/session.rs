//! Vault session management.
//!
//! A [`VaultSession`] is the single state machine around the wallet:
//! not yet configured, locked, or unlocked. Only an unlocked session
//! holds the derived wallet key and the decrypted entries, and both are
//! gone again after [`VaultSession::lock`]. All operations take
//! `&mut self`, so state transitions are serialized by construction.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use zeroize::Zeroize;

use ethervault_common::{Address, Error, PrivateKeyHex, Result};
use ethervault_crypto::{cipher, kdf, VaultKey};
use ethervault_storage::{
    CredentialMethod, CredentialRecord, CredentialRegistry, KeyRecordStore, MethodKind,
    NewKeyRecord, StorageBackend,
};

use crate::authenticator::{PlatformAuthenticator, PrfRequest};
use crate::keysource::KeyMaterial;

/// Minimum password length accepted at setup.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Coarse vault state, as reported to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// No credential has ever been configured.
    NoWallet,
    /// A credential exists but no key material is in memory.
    Locked,
    /// The wallet key and decrypted entries are in memory.
    Unlocked,
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultState::NoWallet => write!(f, "no_wallet"),
            VaultState::Locked => write!(f, "locked"),
            VaultState::Unlocked => write!(f, "unlocked"),
        }
    }
}

/// One decrypted key held by an unlocked session.
///
/// Not `Clone`: the plaintext lives in exactly one place and is zeroized
/// when the session locks or drops.
#[derive(Debug)]
pub struct DecryptedKeyEntry {
    /// Persisted record ID.
    pub id: u64,
    /// User-facing label.
    pub label: String,
    /// Public account address.
    pub address: Address,
    /// Plaintext private key.
    pub key: PrivateKeyHex,
}

/// Internal state; the data each variant carries is exactly what that
/// state is allowed to know.
enum SessionState {
    NoWallet,
    Locked {
        method: MethodKind,
        stored_keys: usize,
    },
    Unlocked {
        key: VaultKey,
        method: MethodKind,
        entries: Vec<DecryptedKeyEntry>,
        active: usize,
    },
}

/// The wallet state machine.
///
/// Owns the credential registry and key record store over a shared
/// storage backend, plus the platform traits it drives. There is no
/// transition back to [`VaultState::NoWallet`]: once configured, a
/// wallet stays configured for the life of its storage.
pub struct VaultSession {
    credentials: CredentialRegistry,
    records: KeyRecordStore,
    authenticator: Arc<dyn PlatformAuthenticator>,
    key_material: Arc<dyn KeyMaterial>,
    rp_id: String,
    state: SessionState,
}

impl VaultSession {
    /// Open a session over the given backend.
    ///
    /// Reads the credential registry to decide the starting state: a
    /// stored descriptor means `Locked`, none means `NoWallet`. An empty
    /// store is not an error.
    pub async fn initialize(
        backend: Arc<dyn StorageBackend>,
        authenticator: Arc<dyn PlatformAuthenticator>,
        key_material: Arc<dyn KeyMaterial>,
        rp_id: &str,
    ) -> Result<Self> {
        debug!(backend = backend.name(), rp_id, "Opening vault session");

        let credentials = CredentialRegistry::new(backend.clone());
        let records = KeyRecordStore::new(backend);

        let state = match credentials.get().await? {
            Some(record) => SessionState::Locked {
                method: record.method.kind(),
                stored_keys: records.count().await?,
            },
            None => SessionState::NoWallet,
        };

        let session = Self {
            credentials,
            records,
            authenticator,
            key_material,
            rp_id: rp_id.to_string(),
            state,
        };
        debug!(state = %session.state(), "Vault session initialized");
        Ok(session)
    }

    /// Configure the wallet with a platform credential.
    ///
    /// Creates a discoverable credential and then proves PRF support by
    /// evaluating it immediately; creation results alone are not
    /// trusted. The session comes out unlocked with an empty key list.
    ///
    /// # Postconditions
    /// - On any error, nothing has been persisted and the state is
    ///   still `NoWallet`
    ///
    /// # Errors
    /// - `InvalidState` if a wallet is already configured
    /// - `CapabilityUnavailable` if the authenticator or its PRF is missing
    /// - `UserCancelled` if either prompt is dismissed
    pub async fn setup_with_biometric(&mut self) -> Result<()> {
        self.ensure_no_wallet()?;

        debug!(rp_id = %self.rp_id, "Creating platform credential");
        let created = self.authenticator.create_credential(&self.rp_id).await?;

        let prf = self
            .authenticator
            .get_prf_output(PrfRequest {
                rp_id: &self.rp_id,
                credential_id: &created.credential_id,
                transports: &created.transports,
                salt: kdf::PRF_EVAL_SALT,
            })
            .await?;
        let key = kdf::derive_from_prf(&prf)?;

        let method = CredentialMethod::Prf {
            credential_id: created.credential_id,
            rp_id: self.rp_id.clone(),
            transports: created.transports,
        };
        self.credentials.save(&CredentialRecord::new(method)).await?;

        self.state = SessionState::Unlocked {
            key,
            method: MethodKind::Prf,
            entries: Vec::new(),
            active: 0,
        };

        info!(method = %MethodKind::Prf, "Wallet configured");
        Ok(())
    }

    /// Configure the wallet with a password.
    ///
    /// Generates a fresh persisted salt, derives the wallet key, and
    /// stores the credential record. The session comes out unlocked
    /// with an empty key list.
    ///
    /// # Errors
    /// - `InvalidState` if a wallet is already configured
    /// - `Validation` if the passwords differ or the password is shorter
    ///   than [`MIN_PASSWORD_LENGTH`]
    pub async fn setup_with_password(&mut self, password: &str, confirm: &str) -> Result<()> {
        self.ensure_no_wallet()?;

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if password != confirm {
            return Err(Error::Validation("Passwords do not match".to_string()));
        }

        let salt = ethervault_crypto::Salt::generate();
        let key = kdf::derive_from_password(password, &salt)?;

        let method = CredentialMethod::Password { salt };
        self.credentials.save(&CredentialRecord::new(method)).await?;

        self.state = SessionState::Unlocked {
            key,
            method: MethodKind::Password,
            entries: Vec::new(),
            active: 0,
        };

        info!(method = %MethodKind::Password, "Wallet configured");
        Ok(())
    }

    /// Unlock with the stored platform credential.
    ///
    /// Runs a PRF assertion against the persisted credential, using the
    /// relying party and transports stored at registration, then derives
    /// the wallet key and decrypts every stored record before the state
    /// changes. A wrong key or a corrupted record leaves the vault
    /// locked with nothing partially exposed.
    ///
    /// # Errors
    /// - `InvalidState` if there is no wallet or it is already unlocked
    /// - `Validation` if the wallet was configured with a password
    /// - `UserCancelled` if the prompt is dismissed
    /// - `Decryption` if any stored record fails to decrypt
    pub async fn unlock_with_biometric(&mut self) -> Result<()> {
        let record = self.credential_for_unlock().await?;

        let (credential_id, rp_id, transports) = match record.method {
            CredentialMethod::Prf {
                credential_id,
                rp_id,
                transports,
            } => (credential_id, rp_id, transports),
            CredentialMethod::Password { .. } => {
                return Err(Error::Validation(
                    "Wallet uses a password credential; unlock with the password".to_string(),
                ))
            }
        };

        debug!(rp_id = %rp_id, "Requesting PRF assertion");
        let prf = self
            .authenticator
            .get_prf_output(PrfRequest {
                rp_id: &rp_id,
                credential_id: &credential_id,
                transports: &transports,
                salt: kdf::PRF_EVAL_SALT,
            })
            .await?;

        let key = kdf::derive_from_prf(&prf)?;
        self.finish_unlock(key, MethodKind::Prf).await
    }

    /// Unlock with the wallet password.
    ///
    /// A wrong password is indistinguishable from a corrupted record:
    /// both surface as `Decryption` from the bulk decrypt. With zero
    /// stored keys there is nothing to check against, so any password
    /// unlocks an empty vault.
    ///
    /// # Errors
    /// - `InvalidState` if there is no wallet or it is already unlocked
    /// - `Validation` if the wallet was configured with a platform credential
    /// - `Decryption` if any stored record fails to decrypt
    pub async fn unlock_with_password(&mut self, password: &str) -> Result<()> {
        let record = self.credential_for_unlock().await?;

        let salt = match record.method {
            CredentialMethod::Password { salt } => salt,
            CredentialMethod::Prf { .. } => {
                return Err(Error::Validation(
                    "Wallet uses a platform credential; unlock with the authenticator".to_string(),
                ))
            }
        };

        let key = kdf::derive_from_password(password, &salt)?;
        self.finish_unlock(key, MethodKind::Password).await
    }

    /// Lock the vault, clearing all plaintext from memory.
    ///
    /// Every decrypted entry is overwritten before being discarded, and
    /// the wallet key is zeroized on drop. Calling this while already
    /// locked, or before setup, is a no-op.
    pub fn lock(&mut self) {
        let (method, stored_keys) = match &self.state {
            SessionState::Unlocked {
                method, entries, ..
            } => (*method, entries.len()),
            _ => return,
        };

        let previous = std::mem::replace(
            &mut self.state,
            SessionState::Locked {
                method,
                stored_keys,
            },
        );

        if let SessionState::Unlocked {
            key, mut entries, ..
        } = previous
        {
            for entry in entries.iter_mut() {
                entry.key.zeroize();
            }
            // The wallet key is zeroized on drop due to ZeroizeOnDrop
            drop(key);
        }

        info!(keys = stored_keys, "Vault locked");
    }

    /// Import an existing private key into the vault.
    ///
    /// The input is normalized (trimmed, `0x` added if missing) and the
    /// address derived before anything is written. The record is
    /// persisted first; the in-memory entry appears only once the write
    /// has succeeded, and the new key becomes the active one. Without a
    /// label the key gets the same "Key N" name as a generated one.
    ///
    /// Returns the assigned record ID.
    ///
    /// # Errors
    /// - `InvalidState` if the vault is not unlocked
    /// - `Validation` if the key is malformed; the message never echoes
    ///   the input
    pub async fn import_key(&mut self, label: &str, raw_key: &str) -> Result<u64> {
        self.ensure_unlocked("import a key")?;

        let key = PrivateKeyHex::parse(raw_key)?;
        let address = self.key_material.address_of(&key)?;

        let label = match label.trim() {
            "" => format!("Key {}", self.records.count().await? + 1),
            trimmed => trimmed.to_string(),
        };

        self.store_key(label, address, key).await
    }

    /// Generate a fresh random key and store it.
    ///
    /// Without a label the key is named "Key N", counting from the
    /// number of records already persisted.
    ///
    /// Returns the assigned record ID.
    ///
    /// # Errors
    /// - `InvalidState` if the vault is not unlocked
    pub async fn generate_key(&mut self, label: Option<&str>) -> Result<u64> {
        self.ensure_unlocked("generate a key")?;

        let label = match label.map(str::trim) {
            Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
            _ => format!("Key {}", self.records.count().await? + 1),
        };

        let generated = self.key_material.generate()?;
        self.store_key(label, generated.address, generated.key).await
    }

    /// Rename a stored key.
    ///
    /// The persisted record is updated first; the in-memory entry
    /// follows once the write has succeeded. Nothing but the label
    /// changes.
    ///
    /// # Errors
    /// - `InvalidState` if the vault is not unlocked
    /// - `Validation` if the new label is empty after trimming
    /// - `NotFound` if no record has the given ID
    pub async fn rename_key(&mut self, id: u64, new_label: &str) -> Result<()> {
        self.ensure_unlocked("rename a key")?;

        let label = new_label.trim();
        if label.is_empty() {
            return Err(Error::Validation("Label cannot be empty".to_string()));
        }

        self.records.update_label(id, label).await?;

        if let SessionState::Unlocked { entries, .. } = &mut self.state {
            if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
                entry.label = label.to_string();
            }
        }

        info!(id, "Key renamed");
        Ok(())
    }

    /// Make the key at `index` the active one.
    ///
    /// # Errors
    /// - `InvalidState` if the vault is not unlocked
    /// - `Validation` if the index is out of range; the active selection
    ///   is unchanged
    pub fn switch_active_key(&mut self, index: usize) -> Result<()> {
        match &mut self.state {
            SessionState::Unlocked {
                entries, active, ..
            } => {
                if index >= entries.len() {
                    return Err(Error::Validation(format!(
                        "Key index {} is out of range ({} keys)",
                        index,
                        entries.len()
                    )));
                }
                *active = index;
                debug!(index, "Active key switched");
                Ok(())
            }
            _ => Err(Error::InvalidState("Vault is not unlocked".to_string())),
        }
    }

    /// Current coarse state.
    pub fn state(&self) -> VaultState {
        match self.state {
            SessionState::NoWallet => VaultState::NoWallet,
            SessionState::Locked { .. } => VaultState::Locked,
            SessionState::Unlocked { .. } => VaultState::Unlocked,
        }
    }

    /// Check if the vault is unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.state() == VaultState::Unlocked
    }

    /// Credential method, once a wallet is configured.
    pub fn credential_method(&self) -> Option<MethodKind> {
        match &self.state {
            SessionState::NoWallet => None,
            SessionState::Locked { method, .. } => Some(*method),
            SessionState::Unlocked { method, .. } => Some(*method),
        }
    }

    /// Number of stored keys the session knows about.
    ///
    /// While locked this is the persisted count observed at the last
    /// state change; while unlocked it is exact.
    pub fn stored_key_count(&self) -> usize {
        match &self.state {
            SessionState::NoWallet => 0,
            SessionState::Locked { stored_keys, .. } => *stored_keys,
            SessionState::Unlocked { entries, .. } => entries.len(),
        }
    }

    /// Decrypted entries, in storage order; empty unless unlocked.
    pub fn entries(&self) -> &[DecryptedKeyEntry] {
        match &self.state {
            SessionState::Unlocked { entries, .. } => entries,
            _ => &[],
        }
    }

    /// Index of the active key, while unlocked and non-empty.
    pub fn active_index(&self) -> Option<usize> {
        match &self.state {
            SessionState::Unlocked { entries, active, .. } if !entries.is_empty() => Some(*active),
            _ => None,
        }
    }

    /// The active entry, while unlocked and non-empty.
    pub fn active_entry(&self) -> Option<&DecryptedKeyEntry> {
        match &self.state {
            SessionState::Unlocked { entries, active, .. } => entries.get(*active),
            _ => None,
        }
    }

    /// Address of the active key, while unlocked and non-empty.
    pub fn active_address(&self) -> Option<&Address> {
        self.active_entry().map(|entry| &entry.address)
    }

    fn ensure_no_wallet(&self) -> Result<()> {
        match self.state {
            SessionState::NoWallet => Ok(()),
            _ => Err(Error::InvalidState(
                "Wallet is already configured".to_string(),
            )),
        }
    }

    fn ensure_unlocked(&self, action: &str) -> Result<()> {
        match self.state {
            SessionState::Unlocked { .. } => Ok(()),
            _ => Err(Error::InvalidState(format!(
                "Cannot {}: vault is not unlocked",
                action
            ))),
        }
    }

    /// Fetch the stored credential for an unlock attempt.
    async fn credential_for_unlock(&self) -> Result<CredentialRecord> {
        match self.state {
            SessionState::Locked { .. } => {}
            SessionState::NoWallet => {
                return Err(Error::InvalidState("No wallet is configured".to_string()))
            }
            SessionState::Unlocked { .. } => {
                return Err(Error::InvalidState(
                    "Wallet is already unlocked".to_string(),
                ))
            }
        }

        self.credentials
            .get()
            .await?
            .ok_or_else(|| Error::NotFound("Credential record missing from storage".to_string()))
    }

    /// Decrypt every stored record, then transition to unlocked.
    ///
    /// All-or-nothing: the state only changes after the full list has
    /// decrypted, so a failure part-way leaves the vault locked.
    async fn finish_unlock(&mut self, key: VaultKey, method: MethodKind) -> Result<()> {
        let records = self.records.list().await?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let plaintext = cipher::decrypt(&key, &record.ciphertext, &record.iv)?;
            let text = std::str::from_utf8(&plaintext).map_err(|_| Error::Decryption)?;
            let parsed = PrivateKeyHex::parse(text).map_err(|_| Error::Decryption)?;
            entries.push(DecryptedKeyEntry {
                id: record.id,
                label: record.label,
                address: record.address,
                key: parsed,
            });
        }

        let count = entries.len();
        self.state = SessionState::Unlocked {
            key,
            method,
            entries,
            active: 0,
        };

        info!(keys = count, method = %method, "Vault unlocked");
        Ok(())
    }

    /// Encrypt and persist a key, then add it to the session.
    ///
    /// Storage commits before memory changes: a failed write leaves the
    /// session exactly as it was.
    async fn store_key(&mut self, label: String, address: Address, key: PrivateKeyHex) -> Result<u64> {
        let sealed = {
            let vault_key = self.current_key()?;
            cipher::encrypt(vault_key, key.as_str().as_bytes())?
        };

        let record = self
            .records
            .add(NewKeyRecord {
                label: label.clone(),
                address: address.clone(),
                ciphertext: sealed.ciphertext,
                iv: sealed.iv,
            })
            .await?;

        if let SessionState::Unlocked {
            entries, active, ..
        } = &mut self.state
        {
            entries.push(DecryptedKeyEntry {
                id: record.id,
                label,
                address,
                key,
            });
            *active = entries.len() - 1;
        }

        info!(id = record.id, address = %record.address, "Key stored");
        Ok(record.id)
    }

    fn current_key(&self) -> Result<&VaultKey> {
        match &self.state {
            SessionState::Unlocked { key, .. } => Ok(key),
            _ => Err(Error::InvalidState("Vault is not unlocked".to_string())),
        }
    }
}

impl Drop for VaultSession {
    fn drop(&mut self) {
        // Ensure plaintext is zeroized even without an explicit lock
        self.lock();
    }
}
