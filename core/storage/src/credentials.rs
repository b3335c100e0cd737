//! Credential descriptor persistence.
//!
//! The vault stores at most one credential descriptor, which records how
//! the wallet key is derived at unlock time: a platform authenticator
//! credential with the PRF extension, or a password with its PBKDF2 salt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::backend::{StorageBackend, CREDENTIALS_PARTITION};
use ethervault_common::{Error, Result};
use ethervault_crypto::Salt;

/// Fixed primary key of the singleton credential record.
pub const CREDENTIAL_KEY: &str = "primary";

/// How the wallet key is derived at unlock time.
///
/// Serialized with an explicit `method` tag so each variant carries
/// exactly the fields that exist for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum CredentialMethod {
    /// Platform authenticator credential with the PRF extension.
    Prf {
        /// Raw credential ID returned at registration.
        credential_id: Vec<u8>,
        /// Relying party ID the credential was registered under.
        rp_id: String,
        /// Transport hints for later assertion calls.
        transports: Vec<String>,
    },
    /// Password credential with its key derivation salt.
    Password { salt: Salt },
}

impl CredentialMethod {
    /// The discriminant without the method-specific payload.
    pub fn kind(&self) -> MethodKind {
        match self {
            CredentialMethod::Prf { .. } => MethodKind::Prf,
            CredentialMethod::Password { .. } => MethodKind::Password,
        }
    }
}

/// Credential method discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Prf,
    Password,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Prf => write!(f, "prf"),
            MethodKind::Password => write!(f, "password"),
        }
    }
}

/// The singleton credential descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Always [`CREDENTIAL_KEY`]; kept in the record itself so the
    /// document stays self-describing.
    pub id: String,
    /// Derivation method and its parameters.
    #[serde(flatten)]
    pub method: CredentialMethod,
    /// When the credential was set up.
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Create a descriptor for the given method, stamped now.
    pub fn new(method: CredentialMethod) -> Self {
        Self {
            id: CREDENTIAL_KEY.to_string(),
            method,
            created_at: Utc::now(),
        }
    }
}

/// Registry of the zero-or-one stored credential.
pub struct CredentialRegistry {
    backend: Arc<dyn StorageBackend>,
}

impl CredentialRegistry {
    /// Create a registry over the given backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Fetch the stored descriptor, if any.
    ///
    /// An empty store is not an error.
    pub async fn get(&self) -> Result<Option<CredentialRecord>> {
        match self.backend.get(CREDENTIALS_PARTITION, CREDENTIAL_KEY).await? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::Serialization(format!("Corrupt credential record: {}", e))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Persist the descriptor under the fixed key.
    ///
    /// This is an upsert at the storage level; callers decide whether
    /// writing over an existing descriptor is allowed.
    pub async fn save(&self, record: &CredentialRecord) -> Result<()> {
        let bytes =
            serde_json::to_vec(record).map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend
            .put(CREDENTIALS_PARTITION, CREDENTIAL_KEY, bytes)
            .await
    }

    /// Remove the descriptor. No vault operation calls this.
    pub async fn delete(&self) -> Result<()> {
        self.backend
            .delete(CREDENTIALS_PARTITION, CREDENTIAL_KEY)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn registry() -> CredentialRegistry {
        CredentialRegistry::new(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn test_empty_registry_returns_none() {
        assert!(registry().get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_get_prf_descriptor() {
        let registry = registry();
        let record = CredentialRecord::new(CredentialMethod::Prf {
            credential_id: vec![1, 2, 3, 4],
            rp_id: "localhost".to_string(),
            transports: vec!["internal".to_string()],
        });

        registry.save(&record).await.unwrap();
        let loaded = registry.get().await.unwrap().unwrap();

        assert_eq!(loaded.id, CREDENTIAL_KEY);
        assert_eq!(loaded.method.kind(), MethodKind::Prf);
        match loaded.method {
            CredentialMethod::Prf { credential_id, rp_id, transports } => {
                assert_eq!(credential_id, vec![1, 2, 3, 4]);
                assert_eq!(rp_id, "localhost");
                assert_eq!(transports, vec!["internal".to_string()]);
            }
            CredentialMethod::Password { .. } => panic!("wrong method"),
        }
    }

    #[tokio::test]
    async fn test_save_get_password_descriptor() {
        let registry = registry();
        let salt = Salt::from_bytes([9u8; 32]);
        registry
            .save(&CredentialRecord::new(CredentialMethod::Password { salt }))
            .await
            .unwrap();

        let loaded = registry.get().await.unwrap().unwrap();
        assert_eq!(loaded.method.kind(), MethodKind::Password);
        match loaded.method {
            CredentialMethod::Password { salt } => assert_eq!(salt.as_bytes(), &[9u8; 32]),
            CredentialMethod::Prf { .. } => panic!("wrong method"),
        }
    }

    #[tokio::test]
    async fn test_method_tag_in_document() {
        let record = CredentialRecord::new(CredentialMethod::Password {
            salt: Salt::from_bytes([0u8; 32]),
        });

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"method\":\"password\""));
        assert!(json.contains("\"id\":\"primary\""));
    }

    #[tokio::test]
    async fn test_save_overwrites_existing() {
        let registry = registry();

        registry
            .save(&CredentialRecord::new(CredentialMethod::Password {
                salt: Salt::from_bytes([1u8; 32]),
            }))
            .await
            .unwrap();
        registry
            .save(&CredentialRecord::new(CredentialMethod::Password {
                salt: Salt::from_bytes([2u8; 32]),
            }))
            .await
            .unwrap();

        match registry.get().await.unwrap().unwrap().method {
            CredentialMethod::Password { salt } => assert_eq!(salt.as_bytes(), &[2u8; 32]),
            CredentialMethod::Prf { .. } => panic!("wrong method"),
        }
    }
}
