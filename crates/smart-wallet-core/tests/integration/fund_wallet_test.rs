//! Test-network funding flow
//!
//! Funding creates a throwaway account, airdrops into it, and drains it into
//! the wallet minus the base reserve and a fee cushion. The interesting part
//! is the authorization conversion: the faucet transfer authorizes via the
//! throwaway source account, and those entries are rewritten into signed
//! address entries so sponsorship routing stays uniform.

use crate::common::*;
use smart_wallet_core::network::SimulationResponse;
use smart_wallet_core::submit::{BASE_RESERVE_STROOPS, FEE_CUSHION_STROOPS};
use smart_wallet_core::types::Credential;
use smart_wallet_core::{Error, ScValue};
use std::sync::atomic::Ordering;

fn funded_config() -> smart_wallet_core::SmartWalletConfig {
    test_config()
        .with_faucet_url("https://faucet.local")
        .unwrap()
        .with_native_asset_contract(contract(0xFA))
        .unwrap()
}

fn balance_response(stroops: i128) -> SimulationResponse {
    SimulationResponse {
        result: Some(ScValue::I128(stroops)),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_funding_drains_minus_reserve() {
    let network = MockNetwork::new();
    let wallet = wallet_with(funded_config(), network.clone(), None, MockAuthenticator::new());
    let address = wallet.connect(MOCK_CREDENTIAL_ID).await.unwrap();

    let balance = 3 * 10_000_000;
    network.push_simulation(balance_response(balance));
    network.push_simulation(simulation_with_source_auth());

    let result = wallet.fund_wallet().await.unwrap();

    assert!(result.success);
    assert_eq!(network.airdrops.load(Ordering::SeqCst), 1);
    assert_eq!(network.send_count(), 1);

    let sent = network.last_sent.lock().clone().unwrap();
    assert_eq!(sent.call.function, "transfer");
    assert_eq!(sent.call.contract_id, contract(0xFA));
    assert_eq!(
        sent.call.args[2],
        ScValue::I128(balance - BASE_RESERVE_STROOPS - FEE_CUSHION_STROOPS)
    );
    // Destination is the connected wallet
    assert_eq!(sent.call.args[1], ScValue::Address(address));
    assert!(sent.is_signed());
}

#[tokio::test(start_paused = true)]
async fn test_source_entries_are_converted_and_signed() {
    let network = MockNetwork::new();
    let wallet = wallet_with(funded_config(), network.clone(), None, MockAuthenticator::new());
    wallet.connect(MOCK_CREDENTIAL_ID).await.unwrap();

    network.push_simulation(balance_response(50_000_000));
    network.push_simulation(simulation_with_source_auth());

    let result = wallet.fund_wallet().await.unwrap();
    assert!(result.success);

    let sent = network.last_sent.lock().clone().unwrap();
    assert_eq!(sent.auth.len(), 1);
    match &sent.auth[0].credential {
        Credential::Address {
            address, signature, ..
        } => {
            // Rewritten to the throwaway funder account, signed with its key
            assert!(address.starts_with('G'));
            let signature = signature.clone().unwrap();
            assert_eq!(signature.map_keys().unwrap(), vec!["public_key", "signature"]);
        }
        other => panic!("expected converted address credential, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_sponsored_funding_uses_call_mode() {
    let network = MockNetwork::new();
    let sponsor = MockSponsor::new();
    let wallet = wallet_with(
        funded_config(),
        network.clone(),
        Some(sponsor.clone()),
        MockAuthenticator::new(),
    );
    wallet.connect(MOCK_CREDENTIAL_ID).await.unwrap();

    network.push_simulation(balance_response(50_000_000));
    network.push_simulation(simulation_with_source_auth());

    let result = wallet.fund_wallet().await.unwrap();
    assert!(result.success);

    // After conversion no source-account entry remains, so the sponsor can
    // wrap the bare call
    assert_eq!(sponsor.call_count(), 1);
    assert_eq!(sponsor.envelope_count(), 0);
    assert_eq!(network.send_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_balance_below_reserve_fails_without_submission() {
    let network = MockNetwork::new();
    let wallet = wallet_with(funded_config(), network.clone(), None, MockAuthenticator::new());
    wallet.connect(MOCK_CREDENTIAL_ID).await.unwrap();

    network.push_simulation(balance_response(BASE_RESERVE_STROOPS));

    let result = wallet.fund_wallet().await.unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("reserve"));
    assert_eq!(network.send_count(), 0);
}

#[tokio::test]
async fn test_funding_requires_configuration() {
    let network = MockNetwork::new();

    // No faucet configured
    let wallet = wallet_with(test_config(), network.clone(), None, MockAuthenticator::new());
    wallet.connect(MOCK_CREDENTIAL_ID).await.unwrap();
    assert!(matches!(
        wallet.fund_wallet().await,
        Err(Error::Config(_))
    ));

    // Not connected
    let wallet = wallet_with(funded_config(), network.clone(), None, MockAuthenticator::new());
    assert!(matches!(
        wallet.fund_wallet().await,
        Err(Error::Validation(_))
    ));
}
