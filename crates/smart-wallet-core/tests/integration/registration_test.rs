//! Registration, connection, and session flows

use crate::common::*;
use smart_wallet_core::network::{StatusResponse, TxStatus};
use smart_wallet_core::wallet::derive_contract_id;
use smart_wallet_core::DeploymentStatus;

#[tokio::test(start_paused = true)]
async fn test_register_deploys_and_connects() {
    let network = MockNetwork::new();
    let auth = MockAuthenticator::new();
    let wallet = wallet_with(test_config(), network.clone(), None, auth.clone());

    let registration = wallet.register("alice").await.unwrap();

    assert!(registration.result.success);
    assert_eq!(registration.credential_id, MOCK_CREDENTIAL_ID);

    let config = wallet.config();
    let expected = derive_contract_id(
        &config.network_id(),
        &config.deployer_account(),
        MOCK_CREDENTIAL_ID,
    );
    assert_eq!(registration.contract_id, expected);

    // Connected, and the pending record is gone
    assert_eq!(wallet.address().unwrap(), registration.contract_id);
    assert!(wallet.credentials().await.unwrap().is_empty());

    // The deploy call carried the configured code hash and signer
    let sent = network.last_sent.lock().clone().unwrap();
    assert_eq!(sent.call.function, "deploy");
    assert_eq!(sent.call.contract_id, registration.contract_id);
}

#[tokio::test(start_paused = true)]
async fn test_failed_deployment_keeps_a_diagnostic_record() {
    let network = MockNetwork::new();
    let wallet = wallet_with(test_config(), network.clone(), None, MockAuthenticator::new());

    network.push_status(StatusResponse {
        status: TxStatus::Failed,
        result_xdr: Some("AAAABad=".into()),
        ledger: None,
    });

    let registration = wallet.register("alice").await.unwrap();
    assert!(!registration.result.success);

    // Not connected
    assert!(wallet.address().is_err());

    let records = wallet.credentials().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DeploymentStatus::Failed);
    assert_eq!(
        records[0].contract_id.as_deref(),
        Some(registration.contract_id.as_str())
    );
    assert!(records[0]
        .deployment_error
        .as_deref()
        .unwrap()
        .contains("AAAABad="));
}

#[tokio::test]
async fn test_connect_without_record_derives_deterministically() {
    let network = MockNetwork::new();
    let wallet = wallet_with(test_config(), network.clone(), None, MockAuthenticator::new());

    let first = wallet.connect("some-cred").await.unwrap();
    wallet.disconnect().await.unwrap();
    let second = wallet.connect("some-cred").await.unwrap();
    assert_eq!(first, second);
    assert_ne!(first, wallet.connect("other-cred").await.unwrap());
}

#[tokio::test]
async fn test_reconnect_resumes_the_session() {
    let network = MockNetwork::new();
    let wallet = wallet_with(test_config(), network.clone(), None, MockAuthenticator::new());

    assert!(wallet.reconnect().await.unwrap().is_none());

    let address = wallet.connect(MOCK_CREDENTIAL_ID).await.unwrap();
    let resumed = wallet.reconnect().await.unwrap();
    assert_eq!(resumed.as_deref(), Some(address.as_str()));

    wallet.disconnect().await.unwrap();
    assert!(wallet.address().is_err());
    assert!(wallet.reconnect().await.unwrap().is_none());
}
