//! Transaction Submission Pipeline
//!
//! The pipeline turns a desired contract call into a network-accepted
//! transaction for the connected smart wallet:
//!
//! ```text
//! BUILT -> SIMULATED -> SIGNED -> RE-SIMULATED -> ASSEMBLED -> SUBMITTED
//!                                        -> { CONFIRMED | FAILED | TIMED_OUT }
//! ```
//!
//! The steps of one submission are strictly sequential: each step's input is
//! the previous step's output. The re-simulation after signing is mandatory
//! because resource-fee estimation depends on the final signature payload
//! size; skipping it under-prices the transaction and the network rejects it.
//!
//! On-chain rejection, simulation failure, sponsor refusal, authenticator
//! cancellation, and confirmation timeout all come back as a failed
//! [`TransactionResult`]. Only local validation and configuration mistakes
//! are raised as `Err`.

use crate::authenticator::{normalize_signature, Authenticator, WebAuthnAssertion};
use crate::config::SmartWalletConfig;
use crate::network::{encode_envelope_base64, NetworkClient, SponsorClient, TxStatus};
use crate::types::{
    account_address_from_public_key, AuthEntry, ContractCall, Credential, ScValue, Transaction,
    TransactionResult,
};
use crate::{Error, Result, MAX_POLL_ATTEMPTS, POLL_INTERVAL, STROOPS_PER_UNIT};
use ed25519_dalek::Signer as _;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Base reserve withheld when draining a throwaway funding account
pub const BASE_RESERVE_STROOPS: i128 = STROOPS_PER_UNIT;

/// Fee cushion withheld on top of the base reserve
pub const FEE_CUSHION_STROOPS: i128 = 100;

// ============================================================================
// Submission Mode
// ============================================================================

/// How the assembled transaction reaches the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// No sponsor configured; the signed envelope goes straight to the
    /// ingestion endpoint
    Direct,
    /// Sponsor wraps the bare call and signed entries in its own envelope;
    /// only possible while no entry carries a source-account credential
    SponsorCall,
    /// Sponsor fee-bumps the fully signed envelope; required once a
    /// source-account credential is present, because envelope substitution
    /// is then impossible
    SponsorEnvelope,
}

/// Pick the submission route from the signed entry set
///
/// A pure function of the credential shapes; the pipeline recomputes it at
/// the submission step rather than caching the envelope-signing decision.
pub fn select_mode(sponsor_configured: bool, entries: &[AuthEntry]) -> SubmitMode {
    if !sponsor_configured {
        return SubmitMode::Direct;
    }
    if entries.iter().any(AuthEntry::is_source_account) {
        SubmitMode::SponsorEnvelope
    } else {
        SubmitMode::SponsorCall
    }
}

// ============================================================================
// Signature Payloads
// ============================================================================

/// Payload an authorization signer attests to
///
/// Binds the entry (via its invocation digest and nonce), the expiration
/// ledger, and the network identifier, so a signature cannot be replayed on
/// another network, another entry, or past its lifetime.
pub fn auth_signature_payload(
    network_id: &[u8; 32],
    nonce: i64,
    expiration_ledger: u32,
    invocation_digest: &[u8; 32],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(network_id);
    hasher.update(nonce.to_be_bytes());
    hasher.update(expiration_ledger.to_be_bytes());
    hasher.update(invocation_digest);
    hasher.finalize().into()
}

/// Signature structure an address entry expects from a WebAuthn signer
fn webauthn_signature_value(assertion: &WebAuthnAssertion, compact: &[u8; 64]) -> ScValue {
    ScValue::map(vec![
        (
            "authenticator_data",
            ScValue::bytes(assertion.authenticator_data.clone()),
        ),
        (
            "client_data_json",
            ScValue::bytes(assertion.client_data_json.clone()),
        ),
        (
            "credential_id",
            ScValue::Str(assertion.credential_id.clone()),
        ),
        ("signature", ScValue::bytes(compact.to_vec())),
    ])
}

/// Signature structure an address entry expects from an Ed25519 signer
fn ed25519_signature_value(public_key: &[u8; 32], signature: &[u8; 64]) -> ScValue {
    ScValue::map(vec![
        ("public_key", ScValue::bytes(public_key.to_vec())),
        ("signature", ScValue::bytes(signature.to_vec())),
    ])
}

// ============================================================================
// Pipeline
// ============================================================================

/// Builds, authorizes, prices, submits, and confirms transactions
///
/// One logical submission per smart wallet is in flight at a time;
/// submissions for different wallets are independent.
pub struct SubmissionPipeline {
    config: SmartWalletConfig,
    network: Arc<dyn NetworkClient>,
    sponsor: Option<Arc<dyn SponsorClient>>,
    authenticator: Arc<dyn Authenticator>,
    wallet_contract: RwLock<Option<String>>,
}

impl SubmissionPipeline {
    pub fn new(
        config: SmartWalletConfig,
        network: Arc<dyn NetworkClient>,
        sponsor: Option<Arc<dyn SponsorClient>>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            config,
            network,
            sponsor,
            authenticator,
            wallet_contract: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SmartWalletConfig {
        &self.config
    }

    /// Bind the pipeline to a connected smart-wallet contract
    pub fn set_wallet_contract(&self, contract_id: Option<String>) {
        *self.wallet_contract.write() = contract_id;
    }

    /// The connected smart-wallet contract
    pub fn wallet_contract(&self) -> Result<String> {
        self.wallet_contract
            .read()
            .clone()
            .ok_or_else(|| Error::Validation("no smart wallet connected".into()))
    }

    pub fn sponsor_configured(&self) -> bool {
        self.sponsor.is_some()
    }

    /// Run a simulation-only call and return its decoded result
    ///
    /// No submission, no authorization, no account state touched.
    pub async fn simulate_read(&self, call: ContractCall) -> Result<ScValue> {
        let tx = Transaction::new(self.config.deployer_account(), 0, call);
        let sim = self.network.simulate(&tx).await?;
        if let Some(error) = sim.error {
            return Err(Error::simulation("simulate", error));
        }
        sim.result
            .ok_or_else(|| Error::simulation("simulate", "read-only call returned no value"))
    }

    /// Submit a contract call through the full pipeline
    pub async fn submit(
        &self,
        call: ContractCall,
        initial_auth: Vec<AuthEntry>,
    ) -> Result<TransactionResult> {
        match self.submit_inner(call, initial_auth).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_local() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "submission pipeline failed");
                Ok(TransactionResult::failed(e.to_string()))
            }
        }
    }

    async fn submit_inner(
        &self,
        call: ContractCall,
        initial_auth: Vec<AuthEntry>,
    ) -> Result<TransactionResult> {
        let deployer = self.config.deployer_key();
        let source = self.config.deployer_account();
        let network_id = self.config.network_id();

        // BUILT: authorization is discovered by simulation, not hand-built,
        // so initial_auth is normally empty.
        let sequence = self.network.account_sequence(&source).await?;
        let tx = Transaction::new(source, sequence + 1, call).with_auth(initial_auth);

        // SIMULATED
        let sim = self.network.simulate(&tx).await?;
        if let Some(error) = sim.error {
            return Err(Error::simulation("simulate", error));
        }
        tracing::debug!(entries = sim.auth.len(), "simulation discovered auth entries");

        // SIGNED
        let signed_auth = self.sign_auth_entries(sim.auth).await?;

        // RE-SIMULATED: fee estimation depends on the signature payload size.
        let tx = tx.with_auth(signed_auth);
        let resim = self.network.simulate(&tx).await?;
        if let Some(error) = resim.error {
            return Err(Error::simulation("re-simulate", error));
        }

        // ASSEMBLED
        let mut tx = tx.with_resources(resim.min_resource_fee, resim.resource_data);

        // The envelope stays unsigned only when a sponsor will substitute
        // its own fee-paying envelope, which requires that no entry carries
        // a source-account credential.
        let needs_envelope_signature = !self.sponsor_configured()
            || tx.auth.iter().any(AuthEntry::is_source_account);
        if needs_envelope_signature {
            tx.sign_envelope(&deployer, &network_id)?;
        }

        // SUBMITTED: mode recomputed fresh from the signed entry set.
        let mode = select_mode(self.sponsor_configured(), &tx.auth);
        let hash = self.route_and_submit(&tx, mode).await?;

        // CONFIRMED / FAILED / TIMED_OUT
        self.poll_confirmation(&hash).await
    }

    /// Sign the authorization entries that belong to the connected wallet
    ///
    /// Entries with a source-account credential, and address entries for
    /// other parties, pass through unmodified; they are signed out-of-band
    /// or need no signature at all.
    async fn sign_auth_entries(&self, entries: Vec<AuthEntry>) -> Result<Vec<AuthEntry>> {
        let wallet = self.wallet_contract.read().clone();
        let network_id = self.config.network_id();
        let mut signed = Vec::with_capacity(entries.len());
        // Fetched once per submission, on the first entry that needs it.
        let mut expiration: Option<u32> = None;

        for entry in entries {
            let (address, nonce) = match &entry.credential {
                Credential::Address { address, nonce, .. } => (address.clone(), *nonce),
                Credential::SourceAccount => {
                    signed.push(entry);
                    continue;
                }
            };
            if wallet.as_deref() != Some(address.as_str()) {
                signed.push(entry);
                continue;
            }

            let expiration_ledger = match expiration {
                Some(ledger) => ledger,
                None => {
                    let ledger = self.network.latest_ledger().await?
                        + self.config.signature_expiration_ledgers;
                    expiration = Some(ledger);
                    ledger
                }
            };

            let digest = entry.invocation_digest()?;
            let payload =
                auth_signature_payload(&network_id, nonce, expiration_ledger, &digest);

            // The one human suspend point in the pipeline: may take a long
            // time and may be cancelled, which aborts the whole submission.
            let assertion = self.authenticator.authenticate(payload).await?;
            let compact = normalize_signature(&assertion.signature_der)?;

            signed.push(
                entry.with_signature(
                    expiration_ledger,
                    webauthn_signature_value(&assertion, &compact),
                )?,
            );
        }
        Ok(signed)
    }

    async fn route_and_submit(&self, tx: &Transaction, mode: SubmitMode) -> Result<String> {
        match mode {
            SubmitMode::Direct => {
                let response = self.network.send(tx).await?;
                if let Some(error) = response.error {
                    return Err(Error::Submission(error));
                }
                response
                    .hash
                    .ok_or_else(|| Error::Submission("network returned no hash".into()))
            }
            SubmitMode::SponsorCall => {
                let sponsor = self.sponsor()?;
                let response = sponsor.send_call_with_auth(&tx.call, &tx.auth).await?;
                if !response.success {
                    return Err(Error::Submission(
                        response.error.unwrap_or_else(|| "sponsor rejected call".into()),
                    ));
                }
                response
                    .hash
                    .ok_or_else(|| Error::Submission("sponsor returned no hash".into()))
            }
            SubmitMode::SponsorEnvelope => {
                let sponsor = self.sponsor()?;
                let envelope = encode_envelope_base64(tx)?;
                let response = sponsor.send_signed_envelope(&envelope).await?;
                if !response.success {
                    return Err(Error::Submission(
                        response
                            .error
                            .unwrap_or_else(|| "sponsor rejected envelope".into()),
                    ));
                }
                response
                    .hash
                    .ok_or_else(|| Error::Submission("sponsor returned no hash".into()))
            }
        }
    }

    fn sponsor(&self) -> Result<&Arc<dyn SponsorClient>> {
        self.sponsor
            .as_ref()
            .ok_or_else(|| Error::Submission("sponsor route selected without a sponsor".into()))
    }

    /// Poll for the submitted hash until a definitive status or exhaustion
    ///
    /// Real wall-clock delay between attempts: this models consensus
    /// latency, not a retry of a failed operation. Exhaustion is a failed
    /// result, never an error: the transaction may still confirm later and
    /// the caller decides whether to re-poll.
    async fn poll_confirmation(&self, hash: &str) -> Result<TransactionResult> {
        for attempt in 1..=MAX_POLL_ATTEMPTS {
            let response = self.network.transaction_status(hash).await?;
            match response.status {
                TxStatus::Success => {
                    tracing::info!(hash, ledger = ?response.ledger, "transaction confirmed");
                    return Ok(TransactionResult::ok(hash, response.ledger));
                }
                TxStatus::Failed => {
                    let detail = response
                        .result_xdr
                        .map(|xdr| format!(": {}", xdr))
                        .unwrap_or_default();
                    return Ok(TransactionResult::failed_with_hash(
                        hash,
                        format!("transaction failed on-chain{}", detail),
                    ));
                }
                TxStatus::NotFound => {
                    tracing::debug!(hash, attempt, "transaction not yet found");
                    if attempt < MAX_POLL_ATTEMPTS {
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                }
            }
        }
        let timeout = Error::Timeout(format!(
            "no confirmation after {} polls; the transaction may still confirm later",
            MAX_POLL_ATTEMPTS
        ));
        Ok(TransactionResult::failed_with_hash(hash, timeout.to_string()))
    }

    // ========================================================================
    // Test-network funding
    // ========================================================================

    /// Bootstrap-fund the connected wallet from a test-network faucet
    ///
    /// Creates a throwaway funding keypair, funds it from the faucet, and
    /// transfers its balance (minus reserve) to the wallet. Source-account
    /// entries are converted to address entries signed by the throwaway key
    /// so the same sponsorship routing applies uniformly.
    pub async fn fund_wallet(&self) -> Result<TransactionResult> {
        match self.fund_wallet_inner().await {
            Ok(result) => Ok(result),
            Err(e) if e.is_local() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "wallet funding failed");
                Ok(TransactionResult::failed(e.to_string()))
            }
        }
    }

    async fn fund_wallet_inner(&self) -> Result<TransactionResult> {
        let wallet = self.wallet_contract()?;
        let faucet = self
            .config
            .faucet_url
            .clone()
            .ok_or_else(|| Error::Config("faucet endpoint not configured".into()))?;
        let native = self
            .config
            .native_asset_contract
            .clone()
            .ok_or_else(|| Error::Config("native asset contract not configured".into()))?;
        let network_id = self.config.network_id();

        // Throwaway funding keypair, never persisted.
        let secret: [u8; 32] = rand::random();
        let funder = ed25519_dalek::SigningKey::from_bytes(&secret);
        let funder_account = account_address_from_public_key(&funder.verifying_key().to_bytes());

        self.network.request_airdrop(&faucet, &funder_account).await?;
        tracing::info!(account = %funder_account, "faucet funding requested");

        let balance_call = ContractCall::new(
            &native,
            "balance",
            vec![ScValue::Address(funder_account.clone())],
        )?;
        let balance = match self.simulate_read(balance_call).await? {
            ScValue::I128(v) => v,
            other => {
                return Err(Error::simulation(
                    "simulate",
                    format!("unexpected balance value: {:?}", other),
                ))
            }
        };

        let transferable = balance - BASE_RESERVE_STROOPS - FEE_CUSHION_STROOPS;
        if transferable <= 0 {
            return Err(Error::Submission(format!(
                "faucet balance {} is below the reserve",
                balance
            )));
        }

        let transfer = ContractCall::new(
            &native,
            "transfer",
            vec![
                ScValue::Address(funder_account.clone()),
                ScValue::Address(wallet),
                ScValue::I128(transferable),
            ],
        )?;

        let sequence = self.network.account_sequence(&funder_account).await?;
        let tx = Transaction::new(funder_account.clone(), sequence + 1, transfer);

        let sim = self.network.simulate(&tx).await?;
        if let Some(error) = sim.error {
            return Err(Error::simulation("simulate", error));
        }

        // Convert source-account entries into address entries signed by the
        // throwaway key, with fresh nonces.
        let expiration_ledger =
            self.network.latest_ledger().await? + self.config.signature_expiration_ledgers;
        let mut auth = Vec::with_capacity(sim.auth.len());
        for entry in sim.auth {
            if !entry.is_source_account() {
                auth.push(entry);
                continue;
            }
            let nonce: i64 = rand::random();
            let converted = AuthEntry::address(&funder_account, nonce, entry.invocation.clone());
            let digest = converted.invocation_digest()?;
            let payload = auth_signature_payload(&network_id, nonce, expiration_ledger, &digest);
            let signature = funder.sign(&payload);
            auth.push(converted.with_signature(
                expiration_ledger,
                ed25519_signature_value(
                    &funder.verifying_key().to_bytes(),
                    &signature.to_bytes(),
                ),
            )?);
        }

        let tx = tx.with_auth(auth);
        let resim = self.network.simulate(&tx).await?;
        if let Some(error) = resim.error {
            return Err(Error::simulation("re-simulate", error));
        }
        let mut tx = tx.with_resources(resim.min_resource_fee, resim.resource_data);

        let needs_envelope_signature = !self.sponsor_configured()
            || tx.auth.iter().any(AuthEntry::is_source_account);
        if needs_envelope_signature {
            tx.sign_envelope(&funder, &network_id)?;
        }

        let mode = select_mode(self.sponsor_configured(), &tx.auth);
        let hash = self.route_and_submit(&tx, mode).await?;
        self.poll_confirmation(&hash).await
    }
}
