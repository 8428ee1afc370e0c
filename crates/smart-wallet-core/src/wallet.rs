//! Smart Wallet Facade
//!
//! Ties the pipeline, the credential store, and the managers together behind
//! one entry point: register a passkey and deploy its wallet contract,
//! connect and disconnect, and reach the rule/signer/policy managers.
//!
//! Credential records exist to cover the gap between a registration attempt
//! and its confirmed deployment. A confirmed deployment deletes the record;
//! a failed one patches it with the failure detail and keeps it for
//! diagnostics. The wallet contract id itself is derived deterministically,
//! so nothing is lost by deleting the record.

use crate::authenticator::Authenticator;
use crate::config::SmartWalletConfig;
use crate::credentials::{CredentialStore, CredentialUpdate, DeploymentStatus, StoredCredential, StoredSession};
use crate::network::{HttpSponsorClient, NetworkClient, RpcClient, SponsorClient};
use crate::policy::PolicyManager;
use crate::rules::ContextRuleManager;
use crate::signers::SignerManager;
use crate::submit::SubmissionPipeline;
use crate::types::{contract_address_from_hash, ContractCall, ScValue, Signer, TransactionResult};
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Reconnect session lifetime in seconds
pub const SESSION_TTL_SECS: i64 = 86_400;

/// Outcome of a registration attempt
#[derive(Debug, Clone)]
pub struct Registration {
    pub credential_id: String,
    /// Derived wallet contract id; only live on-chain if `result.success`
    pub contract_id: String,
    pub result: TransactionResult,
}

/// Derive the wallet contract id for a credential
///
/// Deterministic in the network, the deployer account, and the credential
/// id, so any client holding the same configuration resolves the same
/// contract without a lookup.
pub fn derive_contract_id(
    network_id: &[u8; 32],
    deployer_account: &str,
    credential_id: &str,
) -> String {
    let mut salt = Sha256::new();
    salt.update(credential_id.as_bytes());
    let salt: [u8; 32] = salt.finalize().into();

    let mut hasher = Sha256::new();
    hasher.update(network_id);
    hasher.update(deployer_account.as_bytes());
    hasher.update(salt);
    let hash: [u8; 32] = hasher.finalize().into();
    contract_address_from_hash(&hash)
}

/// Client entry point for one smart wallet
#[derive(Clone)]
pub struct SmartWallet {
    pipeline: Arc<SubmissionPipeline>,
    store: Arc<dyn CredentialStore>,
    authenticator: Arc<dyn Authenticator>,
    rules: ContextRuleManager,
    signers: SignerManager,
    policies: PolicyManager,
}

impl SmartWallet {
    /// Build a wallet over explicit boundary implementations
    pub fn new(
        config: SmartWalletConfig,
        network: Arc<dyn NetworkClient>,
        sponsor: Option<Arc<dyn SponsorClient>>,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let pipeline = Arc::new(SubmissionPipeline::new(
            config,
            network,
            sponsor,
            authenticator.clone(),
        ));
        Self {
            rules: ContextRuleManager::new(pipeline.clone()),
            signers: SignerManager::new(pipeline.clone()),
            policies: PolicyManager::new(pipeline.clone()),
            pipeline,
            store,
            authenticator,
        }
    }

    /// Build a wallet over HTTP clients constructed from the configuration
    pub fn connect_rpc(
        config: SmartWalletConfig,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let network = Arc::new(RpcClient::new(config.rpc_url.clone(), config.timeout_secs)?);
        let sponsor: Option<Arc<dyn SponsorClient>> = match &config.sponsor_url {
            Some(url) => Some(Arc::new(HttpSponsorClient::new(
                url.clone(),
                config.timeout_secs,
            )?)),
            None => None,
        };
        Ok(Self::new(config, network, sponsor, authenticator, store))
    }

    pub fn config(&self) -> &SmartWalletConfig {
        self.pipeline.config()
    }

    pub fn rules(&self) -> &ContextRuleManager {
        &self.rules
    }

    pub fn signers(&self) -> &SignerManager {
        &self.signers
    }

    pub fn policies(&self) -> &PolicyManager {
        &self.policies
    }

    pub fn pipeline(&self) -> &Arc<SubmissionPipeline> {
        &self.pipeline
    }

    /// Contract id of the connected wallet
    pub fn address(&self) -> Result<String> {
        self.pipeline.wallet_contract()
    }

    // ========================================================================
    // Registration and Connection
    // ========================================================================

    /// Register a new passkey and deploy its wallet contract
    ///
    /// The credential record is saved as pending before submission, so a
    /// crash mid-deploy leaves a visible record rather than an orphaned
    /// on-chain contract. A confirmed deployment deletes the record and
    /// connects the wallet; a failed one patches the record with the
    /// failure detail.
    pub async fn register(&self, user_name: &str) -> Result<Registration> {
        let config = self.pipeline.config();
        let challenge: [u8; 32] = rand::random();
        let user_id = uuid::Uuid::new_v4().to_string();

        let registration = self
            .authenticator
            .register(challenge, &user_id, user_name)
            .await?;
        if registration.public_key.len() != 65 || registration.public_key[0] != 0x04 {
            return Err(Error::Validation(
                "registration returned a malformed public key".into(),
            ));
        }

        let contract_id = derive_contract_id(
            &config.network_id(),
            &config.deployer_account(),
            &registration.credential_id,
        );
        tracing::info!(
            credential_id = %registration.credential_id,
            contract_id = %contract_id,
            "registering passkey wallet"
        );

        self.store
            .save(StoredCredential::new(
                registration.credential_id.clone(),
                registration.public_key.clone(),
            ))
            .await?;

        let signer = Signer::external(
            config.webauthn_verifier.clone(),
            registration.public_key.clone(),
        )?;
        // The network boundary maps this call onto the deployment host
        // operation for the configured code hash.
        let call = ContractCall::new(
            contract_id.clone(),
            "deploy",
            vec![
                ScValue::bytes(config.wallet_wasm_hash.to_vec()),
                signer.to_scvalue(),
            ],
        )?;

        let result = self.pipeline.submit(call, vec![]).await?;
        if result.success {
            self.store.delete(&registration.credential_id).await?;
            self.establish_session(&registration.credential_id, &contract_id)
                .await?;
        } else {
            let detail = result
                .error
                .clone()
                .unwrap_or_else(|| "deployment failed".into());
            self.store
                .update(
                    &registration.credential_id,
                    CredentialUpdate::new()
                        .contract_id(contract_id.clone())
                        .status(DeploymentStatus::Failed)
                        .deployment_error(detail),
                )
                .await?;
        }

        Ok(Registration {
            credential_id: registration.credential_id,
            contract_id,
            result,
        })
    }

    /// Connect to the wallet of a known credential
    ///
    /// Resolves the contract id from the stored record when one exists, or
    /// deterministically otherwise, and saves a reconnect session.
    pub async fn connect(&self, credential_id: &str) -> Result<String> {
        let config = self.pipeline.config();
        let stored = self.store.get(credential_id).await?;
        let contract_id = stored
            .as_ref()
            .and_then(|c| c.contract_id.clone())
            .unwrap_or_else(|| {
                derive_contract_id(
                    &config.network_id(),
                    &config.deployer_account(),
                    credential_id,
                )
            });

        if stored.is_some() {
            self.store
                .update(
                    credential_id,
                    CredentialUpdate::new().last_used_at(chrono::Utc::now().timestamp()),
                )
                .await?;
        }

        self.establish_session(credential_id, &contract_id).await?;
        tracing::info!(credential_id, contract_id = %contract_id, "wallet connected");
        Ok(contract_id)
    }

    /// Resume the saved session, if one is still live
    pub async fn reconnect(&self) -> Result<Option<String>> {
        match self.store.get_session().await? {
            Some(session) => {
                self.pipeline
                    .set_wallet_contract(Some(session.contract_id.clone()));
                Ok(Some(session.contract_id))
            }
            None => Ok(None),
        }
    }

    /// Disconnect and clear the saved session
    pub async fn disconnect(&self) -> Result<()> {
        self.pipeline.set_wallet_contract(None);
        self.store.clear_session().await
    }

    async fn establish_session(&self, credential_id: &str, contract_id: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        self.store
            .save_session(StoredSession {
                credential_id: credential_id.to_string(),
                contract_id: contract_id.to_string(),
                connected_at: now,
                expires_at: now + SESSION_TTL_SECS,
            })
            .await?;
        self.pipeline
            .set_wallet_contract(Some(contract_id.to_string()));
        Ok(())
    }

    /// Locally known credentials
    pub async fn credentials(&self) -> Result<Vec<StoredCredential>> {
        self.store.get_all().await
    }

    /// Bootstrap-fund the connected wallet from a test-network faucet
    pub async fn fund_wallet(&self) -> Result<TransactionResult> {
        self.pipeline.fund_wallet().await
    }
}
