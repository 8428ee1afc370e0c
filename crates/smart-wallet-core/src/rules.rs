//! Context Rule Manager
//!
//! Context rules are the unit of authorization configuration on a wallet
//! contract: each rule names an operation pattern, a signer list, and an
//! optional policy set. The contract enforces the cardinality limits; this
//! manager pre-checks them locally so an over-limit request fails before any
//! signing ceremony or submission happens.

use crate::submit::SubmissionPipeline;
use crate::types::{
    validate_contract_address, ContextRule, ContextRuleType, ContractCall, ScValue, Signer,
    TransactionResult,
};
use crate::{Error, Result, MAX_CONTEXT_RULES, MAX_POLICIES_PER_RULE, MAX_SIGNERS_PER_RULE};
use std::sync::Arc;

/// Contract-side option encoding: `[]` for none, `[value]` for some
fn option_scvalue(value: Option<ScValue>) -> ScValue {
    match value {
        Some(v) => ScValue::Vec(vec![v]),
        None => ScValue::Vec(vec![]),
    }
}

/// Validate the shape of a new rule before anything leaves the client
fn validate_rule_inputs(
    name: &str,
    signers: &[Signer],
    policies: &[(String, ScValue)],
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("rule name must not be empty".into()));
    }
    if signers.is_empty() {
        return Err(Error::Validation(
            "a context rule requires at least one signer".into(),
        ));
    }
    if signers.len() > MAX_SIGNERS_PER_RULE {
        return Err(Error::Validation(format!(
            "a context rule holds at most {} signers, got {}",
            MAX_SIGNERS_PER_RULE,
            signers.len()
        )));
    }
    if policies.len() > MAX_POLICIES_PER_RULE {
        return Err(Error::Validation(format!(
            "a context rule holds at most {} policies, got {}",
            MAX_POLICIES_PER_RULE,
            policies.len()
        )));
    }
    for (address, _) in policies {
        validate_contract_address(address)?;
    }
    Ok(())
}

/// Manages the context rules of the connected wallet contract
#[derive(Clone)]
pub struct ContextRuleManager {
    pipeline: Arc<SubmissionPipeline>,
}

impl ContextRuleManager {
    pub fn new(pipeline: Arc<SubmissionPipeline>) -> Self {
        Self { pipeline }
    }

    /// Add a context rule
    ///
    /// Runs local shape validation and a simulated rule-count pre-check; if
    /// either fails, nothing is submitted. The contract still enforces the
    /// same limits, so a concurrent writer can only turn this pre-check into
    /// an on-chain rejection, never into an over-limit rule.
    pub async fn add(
        &self,
        rule_type: ContextRuleType,
        name: &str,
        valid_until: Option<u32>,
        signers: Vec<Signer>,
        policies: Vec<(String, ScValue)>,
    ) -> Result<TransactionResult> {
        validate_rule_inputs(name, &signers, &policies)?;

        let count = self.count().await?;
        if count >= MAX_CONTEXT_RULES {
            return Err(Error::Validation(format!(
                "wallet already holds the maximum of {} context rules",
                MAX_CONTEXT_RULES
            )));
        }
        tracing::debug!(rule_type = %rule_type, name, "adding context rule");

        let signer_values = signers.iter().map(Signer::to_scvalue).collect();
        let policy_values = policies
            .into_iter()
            .map(|(address, params)| ScValue::Vec(vec![ScValue::Address(address), params]))
            .collect();

        // Positional contract surface: (type, name, expiry, signers, policies)
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "add_context_rule",
            vec![
                rule_type.to_scvalue(),
                ScValue::Str(name.to_string()),
                option_scvalue(valid_until.map(ScValue::U32)),
                ScValue::Vec(signer_values),
                ScValue::Vec(policy_values),
            ],
        )?;
        self.pipeline.submit(call, vec![]).await
    }

    /// Rename a rule
    pub async fn update_name(&self, rule_id: u32, name: &str) -> Result<TransactionResult> {
        if name.trim().is_empty() {
            return Err(Error::Validation("rule name must not be empty".into()));
        }
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "update_context_rule_name",
            vec![ScValue::U32(rule_id), ScValue::Str(name.to_string())],
        )?;
        self.pipeline.submit(call, vec![]).await
    }

    /// Change or clear a rule's expiration ledger
    pub async fn update_valid_until(
        &self,
        rule_id: u32,
        valid_until: Option<u32>,
    ) -> Result<TransactionResult> {
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "update_context_rule_valid_until",
            vec![
                ScValue::U32(rule_id),
                option_scvalue(valid_until.map(ScValue::U32)),
            ],
        )?;
        self.pipeline.submit(call, vec![]).await
    }

    /// Remove a rule
    ///
    /// Removing the last rule is allowed and leaves the wallet unusable for
    /// new authorizations until a rule is added out-of-band; the contract is
    /// the place to guard against that, not the client.
    pub async fn remove(&self, rule_id: u32) -> Result<TransactionResult> {
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "remove_context_rule",
            vec![ScValue::U32(rule_id)],
        )?;
        self.pipeline.submit(call, vec![]).await
    }

    /// Read one rule by id
    pub async fn get(&self, rule_id: u32) -> Result<ContextRule> {
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "get_context_rule",
            vec![ScValue::U32(rule_id)],
        )?;
        let value = self.pipeline.simulate_read(call).await?;
        ContextRule::from_scvalue(&value)
    }

    /// Read the rules matching an operation pattern, in raw structured form
    pub async fn get_all(&self, rule_type: ContextRuleType) -> Result<ScValue> {
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "get_context_rules",
            vec![rule_type.to_scvalue()],
        )?;
        self.pipeline.simulate_read(call).await
    }

    /// Number of rules currently on the contract
    pub async fn count(&self) -> Result<u32> {
        let call = ContractCall::new(
            self.pipeline.wallet_contract()?,
            "get_context_rule_count",
            vec![],
        )?;
        let value = self.pipeline.simulate_read(call).await?;
        value.as_u32().ok_or_else(|| {
            Error::simulation("simulate", format!("unexpected rule count value: {:?}", value))
        })
    }
}
