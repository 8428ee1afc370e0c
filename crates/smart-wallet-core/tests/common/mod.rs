//! Shared mock boundaries for the test suite
//!
//! The pipeline touches three external surfaces: the contract-execution
//! network, the fee sponsor, and the authenticator. Each mock scripts its
//! responses up front and counts what the code under test actually did.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use smart_wallet_core::authenticator::{Authenticator, WebAuthnAssertion, WebAuthnRegistration};
use smart_wallet_core::network::{
    NetworkClient, SendResponse, SimulationResponse, SponsorClient, SponsorResponse,
    StatusResponse, TxStatus,
};
use smart_wallet_core::types::AuthEntry;
use smart_wallet_core::{
    ContractCall, Error, MemoryCredentialStore, Result, SmartWallet, SmartWalletConfig,
    Transaction,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const MOCK_CREDENTIAL_ID: &str = "mock-cred";
pub const MOCK_LATEST_LEDGER: u32 = 1_000;
pub const MOCK_ACCOUNT_SEQUENCE: i64 = 7;

pub fn contract(byte: u8) -> String {
    smart_wallet_core::types::contract_address_from_hash(&[byte; 32])
}

pub fn test_config() -> SmartWalletConfig {
    SmartWalletConfig::new(
        "https://rpc.local",
        "Standalone Network ; February 2017",
        [9; 32],
        contract(0xEE),
    )
    .unwrap()
}

// ============================================================================
// Mock Network
// ============================================================================

pub struct MockNetwork {
    simulations: Mutex<VecDeque<Result<SimulationResponse>>>,
    statuses: Mutex<VecDeque<StatusResponse>>,
    send_response: Mutex<SendResponse>,
    pub simulate_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub airdrops: AtomicUsize,
    pub last_simulated: Mutex<Option<Transaction>>,
    pub last_sent: Mutex<Option<Transaction>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            simulations: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            send_response: Mutex::new(SendResponse {
                hash: Some("aabb0011".into()),
                error: None,
            }),
            simulate_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            airdrops: AtomicUsize::new(0),
            last_simulated: Mutex::new(None),
            last_sent: Mutex::new(None),
        })
    }

    /// Queue the response for the next simulation; unqueued simulations
    /// succeed with an empty response
    pub fn push_simulation(&self, response: SimulationResponse) {
        self.simulations.lock().push_back(Ok(response));
    }

    pub fn push_simulation_error(&self, error: Error) {
        self.simulations.lock().push_back(Err(error));
    }

    /// Queue the response for the next status poll; unqueued polls report
    /// success
    pub fn push_status(&self, status: StatusResponse) {
        self.statuses.lock().push_back(status);
    }

    pub fn set_send_response(&self, response: SendResponse) {
        *self.send_response.lock() = response;
    }

    pub fn simulate_count(&self) -> usize {
        self.simulate_calls.load(Ordering::SeqCst)
    }

    pub fn send_count(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkClient for MockNetwork {
    async fn simulate(&self, tx: &Transaction) -> Result<SimulationResponse> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_simulated.lock() = Some(tx.clone());
        match self.simulations.lock().pop_front() {
            Some(scripted) => scripted,
            None => Ok(SimulationResponse::default()),
        }
    }

    async fn send(&self, tx: &Transaction) -> Result<SendResponse> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_sent.lock() = Some(tx.clone());
        Ok(self.send_response.lock().clone())
    }

    async fn transaction_status(&self, _hash: &str) -> Result<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().pop_front() {
            Some(scripted) => Ok(scripted),
            None => Ok(StatusResponse {
                status: TxStatus::Success,
                result_xdr: None,
                ledger: Some(MOCK_LATEST_LEDGER + 1),
            }),
        }
    }

    async fn latest_ledger(&self) -> Result<u32> {
        Ok(MOCK_LATEST_LEDGER)
    }

    async fn account_sequence(&self, _account_id: &str) -> Result<i64> {
        Ok(MOCK_ACCOUNT_SEQUENCE)
    }

    async fn request_airdrop(&self, _faucet_url: &str, _account_id: &str) -> Result<()> {
        self.airdrops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Mock Authenticator
// ============================================================================

pub struct MockAuthenticator {
    key: p256::ecdsa::SigningKey,
    cancel: bool,
    pub authenticate_calls: AtomicUsize,
}

impl MockAuthenticator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            key: p256::ecdsa::SigningKey::from_slice(&[7; 32]).unwrap(),
            cancel: false,
            authenticate_calls: AtomicUsize::new(0),
        })
    }

    /// An authenticator whose user declines every ceremony
    pub fn cancelling() -> Arc<Self> {
        Arc::new(Self {
            key: p256::ecdsa::SigningKey::from_slice(&[7; 32]).unwrap(),
            cancel: true,
            authenticate_calls: AtomicUsize::new(0),
        })
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    pub fn ceremony_count(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self, challenge: [u8; 32]) -> Result<WebAuthnAssertion> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        if self.cancel {
            return Err(Error::UserCancelled);
        }
        use p256::ecdsa::signature::Signer as _;
        let signature: p256::ecdsa::Signature = self.key.sign(&challenge);
        Ok(WebAuthnAssertion {
            credential_id: MOCK_CREDENTIAL_ID.into(),
            authenticator_data: vec![0xA5; 37],
            client_data_json: br#"{"type":"webauthn.get"}"#.to_vec(),
            signature_der: signature.to_der().as_bytes().to_vec(),
        })
    }

    async fn register(
        &self,
        _challenge: [u8; 32],
        _user_id: &str,
        _user_name: &str,
    ) -> Result<WebAuthnRegistration> {
        Ok(WebAuthnRegistration {
            credential_id: MOCK_CREDENTIAL_ID.into(),
            public_key: self.public_key(),
            attestation_object: vec![0xAA; 16],
        })
    }
}

// ============================================================================
// Mock Sponsor
// ============================================================================

pub struct MockSponsor {
    response: Mutex<SponsorResponse>,
    pub call_requests: AtomicUsize,
    pub envelope_requests: AtomicUsize,
    pub last_auth: Mutex<Option<Vec<AuthEntry>>>,
    pub last_call: Mutex<Option<ContractCall>>,
    pub last_envelope: Mutex<Option<String>>,
}

impl MockSponsor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(SponsorResponse {
                success: true,
                hash: Some("cc44dd55".into()),
                error: None,
            }),
            call_requests: AtomicUsize::new(0),
            envelope_requests: AtomicUsize::new(0),
            last_auth: Mutex::new(None),
            last_call: Mutex::new(None),
            last_envelope: Mutex::new(None),
        })
    }

    pub fn set_response(&self, response: SponsorResponse) {
        *self.response.lock() = response;
    }

    pub fn call_count(&self) -> usize {
        self.call_requests.load(Ordering::SeqCst)
    }

    pub fn envelope_count(&self) -> usize {
        self.envelope_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SponsorClient for MockSponsor {
    async fn send_call_with_auth(
        &self,
        call: &ContractCall,
        auth: &[AuthEntry],
    ) -> Result<SponsorResponse> {
        self.call_requests.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock() = Some(call.clone());
        *self.last_auth.lock() = Some(auth.to_vec());
        Ok(self.response.lock().clone())
    }

    async fn send_signed_envelope(&self, envelope_base64: &str) -> Result<SponsorResponse> {
        self.envelope_requests.fetch_add(1, Ordering::SeqCst);
        *self.last_envelope.lock() = Some(envelope_base64.to_string());
        Ok(self.response.lock().clone())
    }
}

// ============================================================================
// Wallet Setup
// ============================================================================

pub fn wallet_with(
    config: SmartWalletConfig,
    network: Arc<MockNetwork>,
    sponsor: Option<Arc<MockSponsor>>,
    authenticator: Arc<MockAuthenticator>,
) -> SmartWallet {
    let sponsor = sponsor.map(|s| s as Arc<dyn SponsorClient>);
    SmartWallet::new(
        config,
        network,
        sponsor,
        authenticator,
        Arc::new(MemoryCredentialStore::new()),
    )
}

/// A wallet already connected to its (derived) contract
pub async fn connected_wallet(
    network: Arc<MockNetwork>,
    sponsor: Option<Arc<MockSponsor>>,
    authenticator: Arc<MockAuthenticator>,
) -> (SmartWallet, String) {
    let wallet = wallet_with(test_config(), network, sponsor, authenticator);
    let address = wallet.connect(MOCK_CREDENTIAL_ID).await.unwrap();
    (wallet, address)
}

/// A simulation response requiring one address-credential entry for `address`
pub fn simulation_with_address_auth(address: &str, nonce: i64) -> SimulationResponse {
    let call = ContractCall::new(contract(0x10), "noop", vec![]).unwrap();
    SimulationResponse {
        auth: vec![AuthEntry::address(address, nonce, call.to_invocation())],
        min_resource_fee: 5_000,
        ..Default::default()
    }
}

/// A simulation response requiring one source-account entry
pub fn simulation_with_source_auth() -> SimulationResponse {
    let call = ContractCall::new(contract(0x10), "noop", vec![]).unwrap();
    SimulationResponse {
        auth: vec![AuthEntry::source_account(call.to_invocation())],
        min_resource_fee: 5_000,
        ..Default::default()
    }
}
