//! Configuration for the smart-wallet SDK
//!
//! All required fields are validated at construction time; a bad
//! configuration is a [`Error::Config`] when the config is built, never a
//! surprise at call time.

use crate::types::{account_address_from_public_key, validate_contract_address};
use crate::{Error, Result, DEFAULT_SIGNATURE_EXPIRATION_LEDGERS};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Seed string for the shared default deployer keypair
///
/// When no explicit deployer is configured, the deployer secret is the
/// SHA-256 of this public string. Every implementation that derives from the
/// same string controls the same funding account, which is what makes
/// test-network interoperability work.
pub const DEFAULT_DEPLOYER_SEED: &str = "smart-wallet-default-deployer";

/// Default operation timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Ed25519 deployer secret, zeroized on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct DeployerSecret([u8; 32]);

/// Configuration for a smart-wallet client
#[derive(Clone)]
pub struct SmartWalletConfig {
    /// Simulation/submission RPC endpoint
    pub rpc_url: String,
    /// Network identifier string (passphrase)
    pub network_passphrase: String,
    /// Code hash of the smart-wallet contract
    pub wallet_wasm_hash: [u8; 32],
    /// WebAuthn (secp256r1) verifier contract address
    pub webauthn_verifier: String,
    /// Fee-sponsorship relay endpoint, if any
    pub sponsor_url: Option<String>,
    /// Native asset contract, required only for test-network funding
    pub native_asset_contract: Option<String>,
    /// Test-network faucet endpoint, required only for test-network funding
    pub faucet_url: Option<String>,
    /// Authorization signature lifetime in ledgers
    pub signature_expiration_ledgers: u32,
    /// Operation timeout in seconds
    pub timeout_secs: u64,
    deployer_secret: DeployerSecret,
}

impl SmartWalletConfig {
    /// Build a configuration with the required fields, using the shared
    /// default deployer
    pub fn new(
        rpc_url: impl Into<String>,
        network_passphrase: impl Into<String>,
        wallet_wasm_hash: [u8; 32],
        webauthn_verifier: impl Into<String>,
    ) -> Result<Self> {
        let rpc_url = rpc_url.into();
        let network_passphrase = network_passphrase.into();
        let webauthn_verifier = webauthn_verifier.into();

        if !rpc_url.starts_with("http://") && !rpc_url.starts_with("https://") {
            return Err(Error::Config(format!("invalid RPC endpoint: {}", rpc_url)));
        }
        if network_passphrase.is_empty() {
            return Err(Error::Config("network passphrase must not be empty".into()));
        }
        validate_contract_address(&webauthn_verifier)
            .map_err(|_| Error::Config(format!("invalid WebAuthn verifier: {}", webauthn_verifier)))?;

        Ok(Self {
            rpc_url,
            network_passphrase,
            wallet_wasm_hash,
            webauthn_verifier,
            sponsor_url: None,
            native_asset_contract: None,
            faucet_url: None,
            signature_expiration_ledgers: DEFAULT_SIGNATURE_EXPIRATION_LEDGERS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            deployer_secret: DeployerSecret(default_deployer_secret()),
        })
    }

    /// Use an explicit deployer secret instead of the shared default
    pub fn with_deployer_secret(mut self, secret: [u8; 32]) -> Self {
        self.deployer_secret = DeployerSecret(secret);
        self
    }

    /// Configure a fee-sponsorship relay
    pub fn with_sponsor_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!("invalid sponsor endpoint: {}", url)));
        }
        self.sponsor_url = Some(url);
        Ok(self)
    }

    /// Configure the native asset contract used by test-network funding
    pub fn with_native_asset_contract(mut self, address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        validate_contract_address(&address)
            .map_err(|_| Error::Config(format!("invalid native asset contract: {}", address)))?;
        self.native_asset_contract = Some(address);
        Ok(self)
    }

    /// Configure the test-network faucet endpoint
    pub fn with_faucet_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!("invalid faucet endpoint: {}", url)));
        }
        self.faucet_url = Some(url);
        Ok(self)
    }

    /// Override the authorization signature lifetime
    pub fn with_signature_expiration_ledgers(mut self, ledgers: u32) -> Self {
        self.signature_expiration_ledgers = ledgers;
        self
    }

    /// Override the operation timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Network identifier hash: SHA-256 of the passphrase
    pub fn network_id(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.network_passphrase.as_bytes());
        hasher.finalize().into()
    }

    /// The funding/deployer signing key
    pub fn deployer_key(&self) -> ed25519_dalek::SigningKey {
        ed25519_dalek::SigningKey::from_bytes(&self.deployer_secret.0)
    }

    /// Account address of the funding/deployer key
    pub fn deployer_account(&self) -> String {
        account_address_from_public_key(&self.deployer_key().verifying_key().to_bytes())
    }

    pub fn sponsor_configured(&self) -> bool {
        self.sponsor_url.is_some()
    }
}

impl std::fmt::Debug for SmartWalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartWalletConfig")
            .field("rpc_url", &self.rpc_url)
            .field("network_passphrase", &self.network_passphrase)
            .field("wallet_wasm_hash", &hex::encode(self.wallet_wasm_hash))
            .field("webauthn_verifier", &self.webauthn_verifier)
            .field("sponsor_url", &self.sponsor_url)
            .field("native_asset_contract", &self.native_asset_contract)
            .field("faucet_url", &self.faucet_url)
            .field(
                "signature_expiration_ledgers",
                &self.signature_expiration_ledgers,
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("deployer_secret", &"[REDACTED]")
            .finish()
    }
}

/// Deployer secret derived from the fixed public seed string
///
/// A pure function rather than hidden module state, so tests can substitute
/// an explicit secret through [`SmartWalletConfig::with_deployer_secret`].
pub fn default_deployer_secret() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DEFAULT_DEPLOYER_SEED.as_bytes());
    hasher.finalize().into()
}
