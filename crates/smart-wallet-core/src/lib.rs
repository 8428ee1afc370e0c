//! # Smart Wallet Core
//!
//! Client SDK for policy-governed Soroban smart-wallet contracts.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Context Rules**: Named authorization rules scoped to any call, a single
//!   contract, or a single deployment code hash, each carrying up to 15 signers
//!   and up to 5 policies
//! - **Signer Model**: WebAuthn (passkey), Ed25519, and delegated-address signers
//! - **Policy Encoder**: Simple-threshold, weighted-threshold, and spending-limit
//!   policy install parameters in the key order the policy contracts expect
//! - **Submission Pipeline**: Build, simulate, sign, re-simulate, assemble,
//!   submit, and poll for confirmation, with optional fee sponsorship
//! - **Credential Store**: Pluggable persistence for locally known passkey
//!   credentials and the reconnect session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smart_wallet_core::{SmartWallet, SmartWalletConfig};
//!
//! let config = SmartWalletConfig::new(
//!     "https://soroban-testnet.stellar.org",
//!     "Test SDF Network ; September 2015",
//!     wallet_wasm_hash,
//!     webauthn_verifier,
//! )?;
//!
//! let wallet = SmartWallet::new(config, network, None, authenticator, store);
//!
//! // Add a context rule with one delegated signer
//! let result = wallet
//!     .rules()
//!     .add(ContextRuleType::Default, "daily ops", None, signers, policies)
//!     .await?;
//! ```
//!
//! ## Submission Model
//!
//! Every state-changing call goes through the same pipeline: simulate to
//! discover required authorization, sign the wallet's own authorization
//! entries through the external authenticator, re-simulate to price the
//! final signature payload, then submit either directly or through a fee
//! sponsor. On-chain rejection is an expected outcome and comes back inside
//! [`TransactionResult`], never as an `Err`.

pub mod authenticator;
pub mod config;
pub mod credentials;
pub mod error;
pub mod network;
pub mod policy;
pub mod rules;
pub mod signers;
pub mod submit;
pub mod types;
pub mod wallet;

pub use authenticator::{Authenticator, WebAuthnAssertion, WebAuthnRegistration};
pub use config::SmartWalletConfig;
pub use credentials::{
    CredentialStore, CredentialUpdate, DeploymentStatus, MemoryCredentialStore, StoredCredential,
    StoredSession,
};
pub use error::{Error, Result};
pub use network::{NetworkClient, SponsorClient, SponsorResponse, TxStatus};
pub use policy::{PolicyInstallParams, PolicyManager};
pub use rules::ContextRuleManager;
pub use signers::SignerManager;
pub use submit::{SubmissionPipeline, SubmitMode};
pub use types::{
    ContextRule, ContextRuleType, ContractCall, ScValue, Signer, Transaction, TransactionResult,
};
pub use wallet::{Registration, SmartWallet};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of context rules per smart-wallet contract
pub const MAX_CONTEXT_RULES: u32 = 15;

/// Maximum number of signers per context rule
pub const MAX_SIGNERS_PER_RULE: usize = 15;

/// Maximum number of policies per context rule
pub const MAX_POLICIES_PER_RULE: usize = 5;

/// Atomic units (stroops) per whole token
pub const STROOPS_PER_UNIT: i128 = 10_000_000;

/// Interval between confirmation polls
pub const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);

/// Number of confirmation polls before giving up
pub const MAX_POLL_ATTEMPTS: u32 = 10;

/// Default authorization signature lifetime, in ledgers (~1 hour at 5s/ledger)
pub const DEFAULT_SIGNATURE_EXPIRATION_LEDGERS: u32 = 720;
