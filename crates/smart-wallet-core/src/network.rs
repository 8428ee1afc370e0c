//! Network boundaries consumed by the pipeline
//!
//! Two trait boundaries: [`NetworkClient`] for simulation, submission, and
//! status reads against the contract-execution network, and [`SponsorClient`]
//! for the fee-sponsorship relay. Concrete implementations speak JSON at the
//! boundary; binary XDR conversion belongs to the external codec layer behind
//! the RPC endpoint and is not reimplemented here.

use crate::types::{AuthEntry, ContractCall, ScValue, Transaction};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ============================================================================
// Wire DTOs
// ============================================================================

/// Result of a dry-run execution against network state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    /// Simulation error; fatal for the submitting pipeline
    #[serde(default)]
    pub error: Option<String>,
    /// Authorization entries the simulator determined are required
    #[serde(default)]
    pub auth: Vec<AuthEntry>,
    /// Minimum resource fee for the simulated footprint
    #[serde(default)]
    pub min_resource_fee: i64,
    /// Opaque resource-usage data, merged into the assembled transaction
    #[serde(default)]
    pub resource_data: Option<serde_json::Value>,
    /// Decoded return value, for read-only calls
    #[serde(default)]
    pub result: Option<ScValue>,
}

/// Acknowledgement from the transaction-ingestion endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Status of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Success,
    Failed,
    NotFound,
}

/// Response to a transaction status poll
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: TxStatus,
    #[serde(default)]
    pub result_xdr: Option<String>,
    #[serde(default)]
    pub ledger: Option<u32>,
}

impl StatusResponse {
    pub fn not_found() -> Self {
        Self {
            status: TxStatus::NotFound,
            result_xdr: None,
            ledger: None,
        }
    }
}

/// Response from the sponsorship relay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorResponse {
    pub success: bool,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Boundary Traits
// ============================================================================

/// Simulation/submission boundary of the contract-execution network
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Dry-run a transaction, reporting required authorization and costs
    async fn simulate(&self, tx: &Transaction) -> Result<SimulationResponse>;

    /// Submit a signed envelope to the ingestion endpoint
    async fn send(&self, tx: &Transaction) -> Result<SendResponse>;

    /// Look up the status of a submitted transaction by hash
    async fn transaction_status(&self, hash: &str) -> Result<StatusResponse>;

    /// Current ledger height
    async fn latest_ledger(&self) -> Result<u32>;

    /// Sequence number of an account
    async fn account_sequence(&self, account_id: &str) -> Result<i64>;

    /// Ask a test-network faucet to fund an account
    async fn request_airdrop(&self, faucet_url: &str, account_id: &str) -> Result<()> {
        let url = format!("{}?addr={}", faucet_url, account_id);
        let response = reqwest::get(&url).await?;
        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "faucet returned {} for {}",
                response.status(),
                account_id
            )));
        }
        Ok(())
    }
}

/// Fee-sponsorship relay boundary
#[async_trait]
pub trait SponsorClient: Send + Sync {
    /// Mode 1: hand over a bare call plus signed authorization entries; the
    /// sponsor wraps them in its own fee-paying envelope
    async fn send_call_with_auth(
        &self,
        call: &ContractCall,
        auth: &[AuthEntry],
    ) -> Result<SponsorResponse>;

    /// Mode 2: hand over a fully signed envelope in base64 wire form; the
    /// sponsor fee-bumps it without altering authorization
    async fn send_signed_envelope(&self, envelope_base64: &str) -> Result<SponsorResponse>;
}

/// Base64 wire form of an envelope, as the sponsor boundary expects it
pub fn encode_envelope_base64(tx: &Transaction) -> Result<String> {
    let encoded = serde_json::to_vec(tx)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(encoded))
}

// ============================================================================
// JSON-RPC Implementation
// ============================================================================

#[derive(Debug, Deserialize)]
struct LedgerResponse {
    sequence: u32,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    sequence: i64,
}

/// JSON-RPC client for the simulation/submission endpoint
#[derive(Debug, Clone)]
pub struct RpcClient {
    url: String,
    client: reqwest::Client,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": uuid::Uuid::new_v4().to_string(),
            "method": method,
            "params": params,
        });

        tracing::debug!(method, "rpc request");
        let response: serde_json::Value = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(Error::Network(format!("{}: {}", method, error)));
        }
        let result = response
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl NetworkClient for RpcClient {
    async fn simulate(&self, tx: &Transaction) -> Result<SimulationResponse> {
        self.request("simulateTransaction", serde_json::json!([tx]))
            .await
    }

    async fn send(&self, tx: &Transaction) -> Result<SendResponse> {
        self.request("sendTransaction", serde_json::json!([tx]))
            .await
    }

    async fn transaction_status(&self, hash: &str) -> Result<StatusResponse> {
        self.request("getTransaction", serde_json::json!([hash]))
            .await
    }

    async fn latest_ledger(&self) -> Result<u32> {
        let response: LedgerResponse = self
            .request("getLatestLedger", serde_json::json!([]))
            .await?;
        Ok(response.sequence)
    }

    async fn account_sequence(&self, account_id: &str) -> Result<i64> {
        let response: AccountResponse = self
            .request("getAccount", serde_json::json!([account_id]))
            .await?;
        Ok(response.sequence)
    }
}

// ============================================================================
// HTTP Sponsor Implementation
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SponsorCallRequest<'a> {
    id: String,
    call: &'a ContractCall,
    auth: &'a [AuthEntry],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SponsorEnvelopeRequest<'a> {
    id: String,
    envelope: &'a str,
}

/// HTTP client for a fee-sponsorship relay
#[derive(Debug, Clone)]
pub struct HttpSponsorClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSponsorClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl SponsorClient for HttpSponsorClient {
    async fn send_call_with_auth(
        &self,
        call: &ContractCall,
        auth: &[AuthEntry],
    ) -> Result<SponsorResponse> {
        let request = SponsorCallRequest {
            id: uuid::Uuid::new_v4().to_string(),
            call,
            auth,
        };
        let response = self
            .client
            .post(format!("{}/call", self.base_url))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }

    async fn send_signed_envelope(&self, envelope_base64: &str) -> Result<SponsorResponse> {
        let request = SponsorEnvelopeRequest {
            id: uuid::Uuid::new_v4().to_string(),
            envelope: envelope_base64,
        };
        let response = self
            .client
            .post(format!("{}/envelope", self.base_url))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }
}
