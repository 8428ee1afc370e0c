//! Core types for the smart-wallet SDK
//!
//! This module defines the structured-value model exchanged with the external
//! codec boundary, the signer and context-rule data model, authorization
//! entries, and the client-side transaction envelope.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Base fee for a transaction envelope, in stroops
pub const BASE_FEE: u32 = 100;

/// Hex-encoded byte fields on wire-facing types
pub(crate) mod bytes_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// i128 carried as a decimal string; serde_json numbers cannot hold it
pub(crate) mod i128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &i128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Structured Values
// ============================================================================

/// Structured value exchanged with the contract-execution network
///
/// This is the in-memory form consumed and produced by the external codec
/// boundary; binary XDR conversion happens inside the network client, not
/// here. Map entries are kept key-sorted because the receiving contracts
/// parse maps positionally by key name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScValue {
    Bool(bool),
    U32(u32),
    U64(u64),
    I64(i64),
    I128(#[serde(with = "i128_string")] i128),
    Bytes(#[serde(with = "bytes_hex")] Vec<u8>),
    Str(String),
    Symbol(String),
    Address(String),
    Vec(Vec<ScValue>),
    Map(Vec<(String, ScValue)>),
}

impl ScValue {
    /// Build a map value with entries sorted by key
    pub fn map(entries: Vec<(&str, ScValue)>) -> ScValue {
        let mut entries: Vec<(String, ScValue)> = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        ScValue::Map(entries)
    }

    /// Build a bytes value
    pub fn bytes(data: impl Into<Vec<u8>>) -> ScValue {
        ScValue::Bytes(data.into())
    }

    /// Keys of a map value, in stored order
    pub fn map_keys(&self) -> Option<Vec<&str>> {
        match self {
            ScValue::Map(entries) => Some(entries.iter().map(|(k, _)| k.as_str()).collect()),
            _ => None,
        }
    }

    /// Look up a map entry by key
    pub fn map_get(&self, key: &str) -> Option<&ScValue> {
        match self {
            ScValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Interpret this value as an unsigned 32-bit scalar
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ScValue::U32(v) => Some(*v),
            ScValue::U64(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }
}

// ============================================================================
// Addresses
// ============================================================================

/// Validate a contract address (strkey `C...`)
pub fn validate_contract_address(address: &str) -> Result<()> {
    match stellar_strkey::Strkey::from_string(address) {
        Ok(stellar_strkey::Strkey::Contract(_)) => Ok(()),
        _ => Err(Error::Validation(format!(
            "not a valid contract address: {}",
            address
        ))),
    }
}

/// Validate an address that may be either an account or a contract
pub fn validate_address(address: &str) -> Result<()> {
    match stellar_strkey::Strkey::from_string(address) {
        Ok(stellar_strkey::Strkey::Contract(_))
        | Ok(stellar_strkey::Strkey::PublicKeyEd25519(_)) => Ok(()),
        _ => Err(Error::Validation(format!("not a valid address: {}", address))),
    }
}

/// Encode a 32-byte Ed25519 public key as an account address
pub fn account_address_from_public_key(public_key: &[u8; 32]) -> String {
    stellar_strkey::Strkey::PublicKeyEd25519(stellar_strkey::ed25519::PublicKey(*public_key))
        .to_string()
}

/// Encode a 32-byte contract hash as a contract address
pub fn contract_address_from_hash(hash: &[u8; 32]) -> String {
    stellar_strkey::Strkey::Contract(stellar_strkey::Contract(*hash)).to_string()
}

// ============================================================================
// Context Rules
// ============================================================================

/// Operation pattern a context rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextRuleType {
    /// Matches any operation
    Default,
    /// Matches invocations of one contract
    CallContract { address: String },
    /// Matches deployments of one code hash
    CreateContract { wasm_hash: [u8; 32] },
}

fn malformed(detail: impl std::fmt::Display) -> Error {
    Error::Serialization(format!("malformed context rule record: {}", detail))
}

impl ContextRuleType {
    /// Decode the contract-side enum encoding
    pub fn from_scvalue(value: &ScValue) -> Result<Self> {
        let items = match value {
            ScValue::Vec(items) if !items.is_empty() => items,
            _ => return Err(malformed("rule type is not an enum vec")),
        };
        match (&items[0], items.get(1)) {
            (ScValue::Symbol(tag), None) if tag == "Default" => Ok(ContextRuleType::Default),
            (ScValue::Symbol(tag), Some(ScValue::Address(address))) if tag == "CallContract" => {
                Ok(ContextRuleType::CallContract {
                    address: address.clone(),
                })
            }
            (ScValue::Symbol(tag), Some(ScValue::Bytes(bytes))) if tag == "CreateContract" => {
                let wasm_hash: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| malformed("wasm hash is not 32 bytes"))?;
                Ok(ContextRuleType::CreateContract { wasm_hash })
            }
            _ => Err(malformed("unknown rule type variant")),
        }
    }

    /// Contract-side enum encoding: `[discriminant, payload...]`
    pub fn to_scvalue(&self) -> ScValue {
        match self {
            ContextRuleType::Default => ScValue::Vec(vec![ScValue::Symbol("Default".into())]),
            ContextRuleType::CallContract { address } => ScValue::Vec(vec![
                ScValue::Symbol("CallContract".into()),
                ScValue::Address(address.clone()),
            ]),
            ContextRuleType::CreateContract { wasm_hash } => ScValue::Vec(vec![
                ScValue::Symbol("CreateContract".into()),
                ScValue::Bytes(wasm_hash.to_vec()),
            ]),
        }
    }
}

impl fmt::Display for ContextRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextRuleType::Default => write!(f, "Default"),
            ContextRuleType::CallContract { address } => write!(f, "CallContract({})", address),
            ContextRuleType::CreateContract { wasm_hash } => {
                write!(f, "CreateContract({})", hex::encode(wasm_hash))
            }
        }
    }
}

/// A named authorization rule attached to a smart-wallet contract
///
/// Uniquely identified by `id` within one contract. The contract enforces the
/// cardinality limits; the client pre-checks them to fail fast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRule {
    /// Rule identifier assigned by the contract
    pub id: u32,
    /// Operation pattern this rule applies to
    pub rule_type: ContextRuleType,
    /// Human-readable name (non-empty)
    pub name: String,
    /// Ordered signer list (1..=15)
    pub signers: Vec<Signer>,
    /// Policy address → install parameters (0..=5 entries)
    pub policies: Vec<(String, ScValue)>,
    /// Ledger number after which the rule no longer applies
    pub valid_until: Option<u32>,
}

impl ContextRule {
    /// Decode a rule record as the contract returns it
    pub fn from_scvalue(value: &ScValue) -> Result<Self> {
        let field = |key: &str| {
            value
                .map_get(key)
                .ok_or_else(|| malformed(format!("missing field {}", key)))
        };

        let id = field("id")?
            .as_u32()
            .ok_or_else(|| malformed("id is not a u32"))?;
        let name = match field("name")? {
            ScValue::Str(name) => name.clone(),
            _ => return Err(malformed("name is not a string")),
        };
        let rule_type = ContextRuleType::from_scvalue(field("rule_type")?)?;

        let signers = match field("signers")? {
            ScValue::Vec(items) => items
                .iter()
                .map(Signer::from_scvalue)
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(malformed("signers is not a vec")),
        };

        let policies = match field("policies")? {
            ScValue::Vec(items) => items
                .iter()
                .map(|pair| match pair {
                    ScValue::Vec(entry) if entry.len() == 2 => match (&entry[0], &entry[1]) {
                        (ScValue::Address(address), params) => {
                            Ok((address.clone(), params.clone()))
                        }
                        _ => Err(malformed("policy entry is not [address, params]")),
                    },
                    _ => Err(malformed("policy entry is not a pair")),
                })
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(malformed("policies is not a vec")),
        };

        let valid_until = match field("valid_until")? {
            ScValue::Vec(items) if items.is_empty() => None,
            ScValue::Vec(items) if items.len() == 1 => Some(
                items[0]
                    .as_u32()
                    .ok_or_else(|| malformed("valid_until is not a u32"))?,
            ),
            _ => return Err(malformed("valid_until is not an option vec")),
        };

        Ok(ContextRule {
            id,
            rule_type,
            name,
            signers,
            policies,
            valid_until,
        })
    }
}

// ============================================================================
// Signers
// ============================================================================

/// An entity capable of contributing authorization toward a context rule
///
/// A signer's identity for removal and lookup is its full encoded
/// representation; partial matches are not permitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signer {
    /// Key material verified by an on-chain verifier contract: WebAuthn
    /// (65-byte uncompressed point plus credential id) or Ed25519 (32-byte
    /// key) depending on which verifier is referenced
    External {
        verifier_address: String,
        #[serde(with = "bytes_hex")]
        key_data: Vec<u8>,
    },
    /// An account or contract address that authorizes via the network's
    /// native require-auth mechanism; no local key material
    Delegated { address: String },
}

impl Signer {
    /// Decode the contract-side enum encoding
    pub fn from_scvalue(value: &ScValue) -> Result<Self> {
        let items = match value {
            ScValue::Vec(items) if !items.is_empty() => items,
            _ => return Err(malformed("signer is not an enum vec")),
        };
        match (&items[0], items.get(1), items.get(2)) {
            (ScValue::Symbol(tag), Some(ScValue::Address(verifier)), Some(ScValue::Bytes(key)))
                if tag == "External" =>
            {
                Ok(Signer::External {
                    verifier_address: verifier.clone(),
                    key_data: key.clone(),
                })
            }
            (ScValue::Symbol(tag), Some(ScValue::Address(address)), None) if tag == "Delegated" => {
                Ok(Signer::Delegated {
                    address: address.clone(),
                })
            }
            _ => Err(malformed("unknown signer variant")),
        }
    }

    /// External signer bound to a verifier contract
    pub fn external(verifier_address: impl Into<String>, key_data: Vec<u8>) -> Result<Self> {
        let verifier_address = verifier_address.into();
        validate_contract_address(&verifier_address)?;
        if key_data.is_empty() {
            return Err(Error::Validation("signer key data must not be empty".into()));
        }
        Ok(Signer::External {
            verifier_address,
            key_data,
        })
    }

    /// Delegated signer for an account or contract address
    pub fn delegated(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        validate_address(&address)?;
        Ok(Signer::Delegated { address })
    }

    /// On-chain identity representation
    pub fn to_scvalue(&self) -> ScValue {
        match self {
            Signer::External {
                verifier_address,
                key_data,
            } => ScValue::Vec(vec![
                ScValue::Symbol("External".into()),
                ScValue::Address(verifier_address.clone()),
                ScValue::Bytes(key_data.clone()),
            ]),
            Signer::Delegated { address } => ScValue::Vec(vec![
                ScValue::Symbol("Delegated".into()),
                ScValue::Address(address.clone()),
            ]),
        }
    }
}

// ============================================================================
// Authorization Entries
// ============================================================================

/// Who or what authorized a sub-call, as reported by simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    /// The envelope's own source account authorizes implicitly
    SourceAccount,
    /// An address-bound credential carrying a signature and expiration
    Address {
        address: String,
        nonce: i64,
        signature_expiration_ledger: u32,
        signature: Option<ScValue>,
    },
}

/// The network's unit of authorization for one invocation subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthEntry {
    pub credential: Credential,
    /// Raw decoded invocation tree this entry authorizes
    pub invocation: ScValue,
}

impl AuthEntry {
    /// Entry authorized by the envelope source account
    pub fn source_account(invocation: ScValue) -> Self {
        Self {
            credential: Credential::SourceAccount,
            invocation,
        }
    }

    /// Unsigned address-credential entry, as simulation produces it
    pub fn address(address: impl Into<String>, nonce: i64, invocation: ScValue) -> Self {
        Self {
            credential: Credential::Address {
                address: address.into(),
                nonce,
                signature_expiration_ledger: 0,
                signature: None,
            },
            invocation,
        }
    }

    pub fn is_source_account(&self) -> bool {
        matches!(self.credential, Credential::SourceAccount)
    }

    /// Address of an address-bound credential, if any
    pub fn credential_address(&self) -> Option<&str> {
        match &self.credential {
            Credential::Address { address, .. } => Some(address),
            Credential::SourceAccount => None,
        }
    }

    /// New entry with the signature and expiration filled in; the rest of
    /// the entry is unchanged. Fails on source-account entries, which carry
    /// no signature slot.
    pub fn with_signature(&self, expiration_ledger: u32, signature: ScValue) -> Result<AuthEntry> {
        match &self.credential {
            Credential::Address { address, nonce, .. } => Ok(AuthEntry {
                credential: Credential::Address {
                    address: address.clone(),
                    nonce: *nonce,
                    signature_expiration_ledger: expiration_ledger,
                    signature: Some(signature),
                },
                invocation: self.invocation.clone(),
            }),
            Credential::SourceAccount => Err(Error::Validation(
                "source-account entries carry no signature slot".into(),
            )),
        }
    }

    /// Digest of the invocation tree, used in the signature payload
    pub fn invocation_digest(&self) -> Result<[u8; 32]> {
        let encoded = serde_json::to_vec(&self.invocation)?;
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        Ok(hasher.finalize().into())
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// A contract invocation to be authorized and submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub contract_id: String,
    pub function: String,
    pub args: Vec<ScValue>,
}

impl ContractCall {
    pub fn new(
        contract_id: impl Into<String>,
        function: impl Into<String>,
        args: Vec<ScValue>,
    ) -> Result<Self> {
        let contract_id = contract_id.into();
        validate_contract_address(&contract_id)?;
        Ok(Self {
            contract_id,
            function: function.into(),
            args,
        })
    }

    /// Invocation-tree value for an entry authorizing this call
    pub fn to_invocation(&self) -> ScValue {
        ScValue::map(vec![
            ("args", ScValue::Vec(self.args.clone())),
            ("contract", ScValue::Address(self.contract_id.clone())),
            ("function", ScValue::Symbol(self.function.clone())),
        ])
    }
}

/// One Ed25519 signature over the transaction envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeSignature {
    /// Last four bytes of the signing public key
    #[serde(with = "bytes_hex")]
    pub hint: Vec<u8>,
    #[serde(with = "bytes_hex")]
    pub signature: Vec<u8>,
}

/// Client-side transaction envelope
///
/// The binary wire form is produced by the network client at the boundary;
/// this struct is the structured form the pipeline builds and signs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub source_account: String,
    pub sequence: i64,
    pub call: ContractCall,
    pub auth: Vec<AuthEntry>,
    pub fee: u32,
    /// Minimum resource fee reported by simulation, merged at assembly
    pub resource_fee: i64,
    /// Opaque resource-usage data reported by simulation
    pub resource_data: Option<serde_json::Value>,
    pub signatures: Vec<EnvelopeSignature>,
}

impl Transaction {
    pub fn new(source_account: impl Into<String>, sequence: i64, call: ContractCall) -> Self {
        Self {
            source_account: source_account.into(),
            sequence,
            call,
            auth: vec![],
            fee: BASE_FEE,
            resource_fee: 0,
            resource_data: None,
            signatures: vec![],
        }
    }

    /// Replace the authorization entry set
    pub fn with_auth(mut self, auth: Vec<AuthEntry>) -> Self {
        self.auth = auth;
        self
    }

    /// Merge simulation resource data and minimum resource fee
    pub fn with_resources(
        mut self,
        resource_fee: i64,
        resource_data: Option<serde_json::Value>,
    ) -> Self {
        self.resource_fee = resource_fee;
        self.resource_data = resource_data;
        self
    }

    /// Payload the envelope signature attests to: the network identifier
    /// bound to a digest of the unsigned envelope
    pub fn signing_payload(&self, network_id: &[u8; 32]) -> Result<[u8; 32]> {
        let mut unsigned = self.clone();
        unsigned.signatures.clear();
        let encoded = serde_json::to_vec(&unsigned)?;

        let mut inner = Sha256::new();
        inner.update(&encoded);
        let inner_hash: [u8; 32] = inner.finalize().into();

        let mut hasher = Sha256::new();
        hasher.update(network_id);
        hasher.update(inner_hash);
        Ok(hasher.finalize().into())
    }

    /// Sign the envelope with an Ed25519 key
    pub fn sign_envelope(
        &mut self,
        key: &ed25519_dalek::SigningKey,
        network_id: &[u8; 32],
    ) -> Result<()> {
        use ed25519_dalek::Signer as _;

        let payload = self.signing_payload(network_id)?;
        let signature = key.sign(&payload);
        let public = key.verifying_key().to_bytes();
        self.signatures.push(EnvelopeSignature {
            hint: public[28..].to_vec(),
            signature: signature.to_bytes().to_vec(),
        });
        Ok(())
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of a state-changing operation
///
/// On-chain and network failures come back here with `success = false`;
/// only local validation mistakes are raised as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub success: bool,
    pub hash: Option<String>,
    pub ledger: Option<u32>,
    pub error: Option<String>,
}

impl TransactionResult {
    /// Confirmed on-chain
    pub fn ok(hash: impl Into<String>, ledger: Option<u32>) -> Self {
        Self {
            success: true,
            hash: Some(hash.into()),
            ledger,
            error: None,
        }
    }

    /// Failed before a hash was obtained
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            hash: None,
            ledger: None,
            error: Some(error.into()),
        }
    }

    /// Failed or timed out after submission
    pub fn failed_with_hash(hash: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            hash: Some(hash.into()),
            ledger: None,
            error: Some(error.into()),
        }
    }
}
