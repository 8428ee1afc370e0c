//! Policy install parameters and the policy manager
//!
//! Policies are pluggable authorization constraints layered on top of signer
//! approval. Each kind encodes to a key-sorted structured map: the receiving
//! policy contract parses the map positionally by key name and is not
//! order-tolerant, so the key order here is load-bearing protocol surface.

use crate::submit::SubmissionPipeline;
use crate::types::{validate_contract_address, ContractCall, ScValue, Signer, TransactionResult};
use crate::{Error, Result, STROOPS_PER_UNIT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Install parameters for one policy contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyInstallParams {
    /// Plain n-of-m approval count
    SimpleThreshold { threshold: u32 },
    /// Weighted votes against a threshold; the weight map must be non-empty
    WeightedThreshold {
        signer_weights: Vec<(Signer, u32)>,
        threshold: u32,
    },
    /// Spending cap per rolling ledger period; both fields must be positive
    SpendingLimit {
        limit_stroops: i128,
        period_ledgers: u32,
    },
}

impl PolicyInstallParams {
    /// Encode to the structured install-parameter value the policy contract
    /// consumes
    ///
    /// Pure and deterministic; map keys come out in fixed alphabetical order
    /// regardless of construction order.
    pub fn encode(&self) -> Result<ScValue> {
        match self {
            PolicyInstallParams::SimpleThreshold { threshold } => {
                Ok(ScValue::map(vec![("threshold", ScValue::U32(*threshold))]))
            }
            PolicyInstallParams::WeightedThreshold {
                signer_weights,
                threshold,
            } => {
                if signer_weights.is_empty() {
                    return Err(Error::Validation(
                        "weighted threshold requires a non-empty signer weight map".into(),
                    ));
                }
                let weights = signer_weights
                    .iter()
                    .map(|(signer, weight)| {
                        ScValue::Vec(vec![signer.to_scvalue(), ScValue::U32(*weight)])
                    })
                    .collect();
                Ok(ScValue::map(vec![
                    ("threshold", ScValue::U32(*threshold)),
                    ("signer_weights", ScValue::Vec(weights)),
                ]))
            }
            PolicyInstallParams::SpendingLimit {
                limit_stroops,
                period_ledgers,
            } => {
                if *limit_stroops <= 0 {
                    return Err(Error::Validation(format!(
                        "spending limit must be positive, got {}",
                        limit_stroops
                    )));
                }
                if *period_ledgers == 0 {
                    return Err(Error::Validation(
                        "spending limit period must be positive".into(),
                    ));
                }
                Ok(ScValue::map(vec![
                    ("limit", ScValue::I128(*limit_stroops)),
                    ("period_ledgers", ScValue::U32(*period_ledgers)),
                ]))
            }
        }
    }
}

/// Parse a human-scale decimal amount into atomic units (stroops)
///
/// One whole token is 10^7 stroops; more than seven fractional digits is a
/// validation error rather than silent truncation.
pub fn parse_amount(amount: &str) -> Result<i128> {
    let invalid = || Error::Validation(format!("invalid amount: {}", amount));

    // Signs are rejected up front; "-0.5" would otherwise slip past a
    // negativity check on the parsed whole part.
    if amount.starts_with(['-', '+']) {
        return Err(invalid());
    }

    let (whole_str, frac_str) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(invalid());
    }
    if frac_str.len() > 7 {
        return Err(Error::Validation(format!(
            "amount has more than 7 decimal places: {}",
            amount
        )));
    }

    let whole: i128 = if whole_str.is_empty() {
        0
    } else {
        whole_str.parse().map_err(|_| invalid())?
    };

    let frac: i128 = if frac_str.is_empty() {
        0
    } else {
        let padded = format!("{:0<7}", frac_str);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|stroops| stroops.checked_add(frac))
        .ok_or_else(invalid)
}

/// Adds and removes policies within a context rule
#[derive(Clone)]
pub struct PolicyManager {
    pipeline: Arc<SubmissionPipeline>,
}

impl PolicyManager {
    pub fn new(pipeline: Arc<SubmissionPipeline>) -> Self {
        Self { pipeline }
    }

    /// Install a simple-threshold policy on a rule
    pub async fn add_simple_threshold(
        &self,
        rule_id: u32,
        policy_address: &str,
        threshold: u32,
    ) -> Result<TransactionResult> {
        self.add_policy(
            rule_id,
            policy_address,
            &PolicyInstallParams::SimpleThreshold { threshold },
        )
        .await
    }

    /// Install a weighted-threshold policy on a rule
    pub async fn add_weighted_threshold(
        &self,
        rule_id: u32,
        policy_address: &str,
        signer_weights: Vec<(Signer, u32)>,
        threshold: u32,
    ) -> Result<TransactionResult> {
        self.add_policy(
            rule_id,
            policy_address,
            &PolicyInstallParams::WeightedThreshold {
                signer_weights,
                threshold,
            },
        )
        .await
    }

    /// Install a spending-limit policy on a rule
    ///
    /// `amount` is a human-scale decimal string, converted to stroops before
    /// encoding.
    pub async fn add_spending_limit(
        &self,
        rule_id: u32,
        policy_address: &str,
        amount: &str,
        period_ledgers: u32,
    ) -> Result<TransactionResult> {
        let limit_stroops = parse_amount(amount)?;
        self.add_policy(
            rule_id,
            policy_address,
            &PolicyInstallParams::SpendingLimit {
                limit_stroops,
                period_ledgers,
            },
        )
        .await
    }

    /// Remove a policy from a rule
    pub async fn remove_policy(
        &self,
        rule_id: u32,
        policy_address: &str,
    ) -> Result<TransactionResult> {
        validate_contract_address(policy_address)?;
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "remove_policy",
            vec![
                ScValue::U32(rule_id),
                ScValue::Address(policy_address.to_string()),
            ],
        )?;
        self.pipeline.submit(call, vec![]).await
    }

    async fn add_policy(
        &self,
        rule_id: u32,
        policy_address: &str,
        params: &PolicyInstallParams,
    ) -> Result<TransactionResult> {
        validate_contract_address(policy_address)?;
        let encoded = params.encode()?;
        tracing::debug!(rule_id, policy = policy_address, "installing policy");

        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "add_policy",
            vec![
                ScValue::U32(rule_id),
                ScValue::Address(policy_address.to_string()),
                encoded,
            ],
        )?;
        self.pipeline.submit(call, vec![]).await
    }
}
