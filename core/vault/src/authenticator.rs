//! Platform authenticator abstraction.
//!
//! The session never talks to credential hardware directly; it goes
//! through [`PlatformAuthenticator`]. Registration creates a discoverable
//! credential, and unlocking evaluates the PRF extension against it.
//! [`SoftAuthenticator`] is the in-process implementation used by tests
//! and the CLI.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use ethervault_common::{Error, Result};
use ethervault_crypto::{PrfOutput, PRF_OUTPUT_LENGTH};

type HmacSha256 = Hmac<Sha256>;

/// A credential freshly created by the authenticator.
#[derive(Debug, Clone)]
pub struct CreatedCredential {
    /// Raw credential ID, as the authenticator reports it.
    pub credential_id: Vec<u8>,
    /// Transport hints captured at registration.
    pub transports: Vec<String>,
}

/// Parameters for a PRF assertion against an existing credential.
#[derive(Debug, Clone)]
pub struct PrfRequest<'a> {
    /// Relying party the credential was registered under.
    pub rp_id: &'a str,
    /// Credential to assert.
    pub credential_id: &'a [u8],
    /// Transport hints stored at registration.
    pub transports: &'a [String],
    /// PRF evaluation input.
    pub salt: &'a [u8],
}

/// Interface to the platform credential manager.
///
/// Implementations distinguish two failure classes: the capability being
/// absent (no authenticator, or no PRF support) maps to
/// `Error::CapabilityUnavailable`, while a dismissed or timed-out prompt
/// maps to `Error::UserCancelled`.
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Create a discoverable credential for the relying party, requesting
    /// the PRF extension.
    ///
    /// Whether PRF is actually usable is only learned by evaluating it
    /// afterwards; creation results alone are not trusted.
    async fn create_credential(&self, rp_id: &str) -> Result<CreatedCredential>;

    /// Run an assertion over the credential and evaluate the PRF with the
    /// given salt.
    async fn get_prf_output(&self, request: PrfRequest<'_>) -> Result<PrfOutput>;
}

/// Software authenticator for tests and headless use.
///
/// Mirrors how hardware implements the PRF: a per-device secret keyed by
/// credential ID, so the same credential and salt always produce the same
/// output across assertions. Two knobs simulate the platform failure
/// modes: a device without PRF support, and a user dismissing the prompt.
pub struct SoftAuthenticator {
    secret: [u8; 32],
    supports_prf: bool,
    cancel_next: AtomicBool,
}

impl SoftAuthenticator {
    pub fn new() -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self {
            secret,
            supports_prf: true,
            cancel_next: AtomicBool::new(false),
        }
    }

    /// Authenticator bound to a stable device secret.
    ///
    /// Hosts that have to survive process restarts persist the secret
    /// and rebuild the authenticator from it, so credentials registered
    /// earlier keep producing the same PRF outputs.
    pub fn from_secret(secret: [u8; 32]) -> Self {
        Self {
            secret,
            supports_prf: true,
            cancel_next: AtomicBool::new(false),
        }
    }

    /// Authenticator whose assertions never yield a PRF output.
    pub fn without_prf() -> Self {
        Self {
            supports_prf: false,
            ..Self::new()
        }
    }

    /// Make the next prompt behave as if the user dismissed it.
    pub fn cancel_next(&self) {
        self.cancel_next.store(true, Ordering::SeqCst);
    }

    fn check_prompt(&self) -> Result<()> {
        if self.cancel_next.swap(false, Ordering::SeqCst) {
            return Err(Error::UserCancelled);
        }
        Ok(())
    }
}

impl Default for SoftAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformAuthenticator for SoftAuthenticator {
    async fn create_credential(&self, _rp_id: &str) -> Result<CreatedCredential> {
        self.check_prompt()?;

        let mut credential_id = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut credential_id);

        Ok(CreatedCredential {
            credential_id,
            transports: vec!["internal".to_string()],
        })
    }

    async fn get_prf_output(&self, request: PrfRequest<'_>) -> Result<PrfOutput> {
        self.check_prompt()?;

        if !self.supports_prf {
            return Err(Error::CapabilityUnavailable(
                "Authenticator does not support the PRF extension".to_string(),
            ));
        }

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Crypto(format!("HMAC init failed: {}", e)))?;
        mac.update(request.credential_id);
        mac.update(request.salt);
        let digest = mac.finalize().into_bytes();

        let mut bytes = [0u8; PRF_OUTPUT_LENGTH];
        bytes.copy_from_slice(&digest);
        Ok(PrfOutput::from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prf_output_stable_across_assertions() {
        let auth = SoftAuthenticator::new();
        let cred = auth.create_credential("localhost").await.unwrap();

        let request = PrfRequest {
            rp_id: "localhost",
            credential_id: &cred.credential_id,
            transports: &cred.transports,
            salt: b"wallet-encryption-v1",
        };

        let first = auth.get_prf_output(request.clone()).await.unwrap();
        let second = auth.get_prf_output(request).await.unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[tokio::test]
    async fn test_prf_output_differs_per_credential() {
        let auth = SoftAuthenticator::new();
        let a = auth.create_credential("localhost").await.unwrap();
        let b = auth.create_credential("localhost").await.unwrap();

        let out_a = auth
            .get_prf_output(PrfRequest {
                rp_id: "localhost",
                credential_id: &a.credential_id,
                transports: &a.transports,
                salt: b"wallet-encryption-v1",
            })
            .await
            .unwrap();
        let out_b = auth
            .get_prf_output(PrfRequest {
                rp_id: "localhost",
                credential_id: &b.credential_id,
                transports: &b.transports,
                salt: b"wallet-encryption-v1",
            })
            .await
            .unwrap();

        assert_ne!(out_a.as_bytes(), out_b.as_bytes());
    }

    #[tokio::test]
    async fn test_without_prf_reports_capability_unavailable() {
        let auth = SoftAuthenticator::without_prf();
        let cred = auth.create_credential("localhost").await.unwrap();

        let err = auth
            .get_prf_output(PrfRequest {
                rp_id: "localhost",
                credential_id: &cred.credential_id,
                transports: &cred.transports,
                salt: b"wallet-encryption-v1",
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CapabilityUnavailable(_)));
    }

    #[tokio::test]
    async fn test_cancel_next_rejects_one_prompt() {
        let auth = SoftAuthenticator::new();
        let cred = auth.create_credential("localhost").await.unwrap();

        auth.cancel_next();
        let err = auth
            .get_prf_output(PrfRequest {
                rp_id: "localhost",
                credential_id: &cred.credential_id,
                transports: &cred.transports,
                salt: b"wallet-encryption-v1",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserCancelled));

        // The flag is consumed; the retry goes through.
        auth.get_prf_output(PrfRequest {
            rp_id: "localhost",
            credential_id: &cred.credential_id,
            transports: &cred.transports,
            salt: b"wallet-encryption-v1",
        })
        .await
        .unwrap();
    }
}
