//! External Authenticator Port
//!
//! The signing ceremony for a passkey credential happens outside this crate:
//! a biometric prompt, a hardware key tap, a platform WebAuthn API. The host
//! application supplies an [`Authenticator`] and the pipeline calls it at the
//! single point where a human may be involved. A ceremony can take arbitrarily
//! long and can be cancelled; cancellation surfaces as
//! [`Error::UserCancelled`], distinct from platform failure, so callers can
//! tell "user declined" from "device unreachable".

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Assertion produced by an authentication ceremony
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebAuthnAssertion {
    pub credential_id: String,
    #[serde(with = "crate::types::bytes_hex")]
    pub authenticator_data: Vec<u8>,
    /// Client data JSON, carrying the challenge the signer attested to
    #[serde(with = "crate::types::bytes_hex")]
    pub client_data_json: Vec<u8>,
    /// secp256r1 signature in DER form, as authenticators emit it
    #[serde(with = "crate::types::bytes_hex")]
    pub signature_der: Vec<u8>,
}

/// Result of a registration ceremony
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebAuthnRegistration {
    pub credential_id: String,
    /// Uncompressed secp256r1 public key (65 bytes, leading 0x04)
    #[serde(with = "crate::types::bytes_hex")]
    pub public_key: Vec<u8>,
    #[serde(with = "crate::types::bytes_hex")]
    pub attestation_object: Vec<u8>,
}

/// Capability to produce a cryptographic assertion over a challenge
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run an authentication ceremony over a 32-byte challenge
    ///
    /// May block for a human-scale duration. Fails with
    /// [`Error::UserCancelled`] if the user declines, or [`Error::Signing`]
    /// for platform errors.
    async fn authenticate(&self, challenge: [u8; 32]) -> Result<WebAuthnAssertion>;

    /// Run a registration ceremony, creating a new credential
    async fn register(
        &self,
        challenge: [u8; 32],
        user_id: &str,
        user_name: &str,
    ) -> Result<WebAuthnRegistration>;
}

/// Normalize a DER secp256r1 signature to compact low-S form
///
/// The wallet contract rejects malleable (high-S) signatures, and
/// authenticators make no promise about which half of the curve order they
/// return.
pub fn normalize_signature(der: &[u8]) -> Result<[u8; 64]> {
    let signature = p256::ecdsa::Signature::from_der(der)
        .map_err(|e| Error::Signing(format!("malformed DER signature: {}", e)))?;
    let signature = signature.normalize_s().unwrap_or(signature);

    let mut compact = [0u8; 64];
    compact.copy_from_slice(&signature.to_bytes());
    Ok(compact)
}
