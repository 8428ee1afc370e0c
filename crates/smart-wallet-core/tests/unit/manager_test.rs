//! Unit tests for manager validation and pre-checks
//!
//! Everything here must fail before any signing ceremony or submission, so
//! the assertions check the mock call counters as much as the errors.

use crate::common::*;
use smart_wallet_core::network::SimulationResponse;
use smart_wallet_core::types::contract_address_from_hash;
use smart_wallet_core::{ContextRuleType, Error, ScValue, Signer};

fn signer(byte: u8) -> Signer {
    Signer::delegated(contract_address_from_hash(&[byte; 32])).unwrap()
}

// ============================================================================
// Context Rules
// ============================================================================

#[tokio::test]
async fn test_add_rule_rejects_bad_shapes_locally() {
    let network = MockNetwork::new();
    let auth = MockAuthenticator::new();
    let (wallet, _) = connected_wallet(network.clone(), None, auth.clone()).await;

    let cases: Vec<(&str, Vec<Signer>)> = vec![
        ("", vec![signer(1)]),
        ("session", vec![]),
        ("session", (0..16).map(signer).collect()),
    ];
    for (name, signers) in cases {
        let err = wallet
            .rules()
            .add(ContextRuleType::Default, name, None, signers, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    assert_eq!(network.simulate_count(), 0);
    assert_eq!(network.send_count(), 0);
    assert_eq!(auth.ceremony_count(), 0);
}

#[tokio::test]
async fn test_add_rule_at_capacity_submits_nothing() {
    let network = MockNetwork::new();
    let auth = MockAuthenticator::new();
    let (wallet, _) = connected_wallet(network.clone(), None, auth.clone()).await;

    // Rule-count pre-check reads 15, the maximum
    network.push_simulation(SimulationResponse {
        result: Some(ScValue::U32(15)),
        ..Default::default()
    });

    let err = wallet
        .rules()
        .add(
            ContextRuleType::Default,
            "one too many",
            None,
            vec![signer(1)],
            vec![],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    // Exactly one simulation (the count read) and nothing else
    assert_eq!(network.simulate_count(), 1);
    assert_eq!(network.send_count(), 0);
    assert_eq!(auth.ceremony_count(), 0);
}

#[tokio::test]
async fn test_operations_require_a_connected_wallet() {
    let network = MockNetwork::new();
    let wallet = wallet_with(test_config(), network.clone(), None, MockAuthenticator::new());

    let err = wallet.rules().count().await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = wallet
        .signers()
        .add_delegated(0, &contract(0x30))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(network.simulate_count(), 0);
}

#[tokio::test]
async fn test_count_rejects_non_scalar_result() {
    let network = MockNetwork::new();
    let (wallet, _) = connected_wallet(network.clone(), None, MockAuthenticator::new()).await;

    network.push_simulation(SimulationResponse {
        result: Some(ScValue::Str("fifteen".into())),
        ..Default::default()
    });

    let err = wallet.rules().count().await.unwrap_err();
    assert!(matches!(err, Error::Simulation { .. }));
}

#[tokio::test]
async fn test_update_name_rejects_empty() {
    let network = MockNetwork::new();
    let (wallet, _) = connected_wallet(network.clone(), None, MockAuthenticator::new()).await;

    let err = wallet.rules().update_name(0, "  ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(network.simulate_count(), 0);
}

// ============================================================================
// Signers
// ============================================================================

#[tokio::test]
async fn test_add_passkey_validates_key_shape() {
    let network = MockNetwork::new();
    let (wallet, _) = connected_wallet(network.clone(), None, MockAuthenticator::new()).await;

    // Wrong length
    let err = wallet
        .signers()
        .add_passkey(0, "cred", &[0x04; 64])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Compressed point
    let err = wallet
        .signers()
        .add_passkey(0, "cred", &[0x02; 65])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Empty credential id
    let err = wallet
        .signers()
        .add_passkey(0, "", &[0x04; 65])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(network.simulate_count(), 0);
    assert_eq!(network.send_count(), 0);
}

#[tokio::test]
async fn test_add_ed25519_validates_key_length() {
    let network = MockNetwork::new();
    let (wallet, _) = connected_wallet(network.clone(), None, MockAuthenticator::new()).await;

    let err = wallet
        .signers()
        .add_ed25519(0, &contract(0x40), &[1; 33])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = wallet
        .signers()
        .add_ed25519(0, "not-a-contract", &[1; 32])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(network.simulate_count(), 0);
}

// ============================================================================
// Policies
// ============================================================================

#[tokio::test]
async fn test_policy_manager_validates_before_network() {
    let network = MockNetwork::new();
    let (wallet, _) = connected_wallet(network.clone(), None, MockAuthenticator::new()).await;

    let err = wallet
        .policies()
        .add_spending_limit(0, &contract(0x50), "1.23456789", 17_280)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = wallet
        .policies()
        .add_simple_threshold(0, "bogus-address", 2)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = wallet
        .policies()
        .remove_policy(0, "bogus-address")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(network.simulate_count(), 0);
    assert_eq!(network.send_count(), 0);
}
