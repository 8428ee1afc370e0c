//! Signer Manager
//!
//! Attaches and detaches signers on a context rule. Key-shape validation
//! happens here, before any ceremony or submission: the contract would reject
//! malformed key material anyway, but only after a signing prompt the user
//! should never have seen.

use crate::submit::SubmissionPipeline;
use crate::types::{ContractCall, ScValue, Signer, TransactionResult};
use crate::{Error, Result};
use std::sync::Arc;

/// Uncompressed secp256r1 point length for a WebAuthn public key
const PASSKEY_PUBLIC_KEY_LEN: usize = 65;

/// Ed25519 public key length
const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Manages the signer lists of the connected wallet contract
#[derive(Clone)]
pub struct SignerManager {
    pipeline: Arc<SubmissionPipeline>,
}

impl SignerManager {
    pub fn new(pipeline: Arc<SubmissionPipeline>) -> Self {
        Self { pipeline }
    }

    /// Add a passkey (WebAuthn) signer to a rule
    ///
    /// The public key must be an uncompressed secp256r1 point: 65 bytes with
    /// a leading `0x04`. The verifier is the configured WebAuthn verifier
    /// contract.
    pub async fn add_passkey(
        &self,
        rule_id: u32,
        credential_id: &str,
        public_key: &[u8],
    ) -> Result<TransactionResult> {
        if credential_id.is_empty() {
            return Err(Error::Validation("credential id must not be empty".into()));
        }
        if public_key.len() != PASSKEY_PUBLIC_KEY_LEN {
            return Err(Error::Validation(format!(
                "passkey public key must be {} bytes, got {}",
                PASSKEY_PUBLIC_KEY_LEN,
                public_key.len()
            )));
        }
        if public_key[0] != 0x04 {
            return Err(Error::Validation(
                "passkey public key must be an uncompressed point (leading 0x04)".into(),
            ));
        }

        let verifier = self.pipeline.config().webauthn_verifier.clone();
        let signer = Signer::external(verifier, public_key.to_vec())?;
        tracing::debug!(rule_id, credential_id, "adding passkey signer");
        self.add_signer(rule_id, &signer).await
    }

    /// Add an Ed25519 signer to a rule, bound to an Ed25519 verifier contract
    pub async fn add_ed25519(
        &self,
        rule_id: u32,
        verifier_address: &str,
        public_key: &[u8],
    ) -> Result<TransactionResult> {
        if public_key.len() != ED25519_PUBLIC_KEY_LEN {
            return Err(Error::Validation(format!(
                "ed25519 public key must be {} bytes, got {}",
                ED25519_PUBLIC_KEY_LEN,
                public_key.len()
            )));
        }
        let signer = Signer::external(verifier_address, public_key.to_vec())?;
        self.add_signer(rule_id, &signer).await
    }

    /// Add a delegated signer, an account or contract that authorizes via
    /// the network's native mechanism
    pub async fn add_delegated(&self, rule_id: u32, address: &str) -> Result<TransactionResult> {
        let signer = Signer::delegated(address)?;
        self.add_signer(rule_id, &signer).await
    }

    /// Add an already constructed signer to a rule
    pub async fn add_signer(&self, rule_id: u32, signer: &Signer) -> Result<TransactionResult> {
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "add_signer",
            vec![ScValue::U32(rule_id), signer.to_scvalue()],
        )?;
        self.pipeline.submit(call, vec![]).await
    }

    /// Remove a signer from a rule
    ///
    /// Identity is the signer's full encoded representation; removing the
    /// last signer of a rule is the contract's call to reject, not ours.
    pub async fn remove_signer(&self, rule_id: u32, signer: &Signer) -> Result<TransactionResult> {
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "remove_signer",
            vec![ScValue::U32(rule_id), signer.to_scvalue()],
        )?;
        self.pipeline.submit(call, vec![]).await
    }
}
