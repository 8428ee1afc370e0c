//! Unit tests for credential and session persistence

use smart_wallet_core::{
    CredentialStore, CredentialUpdate, DeploymentStatus, Error, MemoryCredentialStore,
    StoredCredential, StoredSession,
};

fn credential(id: &str) -> StoredCredential {
    StoredCredential::new(id, vec![0x04; 65])
}

fn session(credential_id: &str, expires_at: i64) -> StoredSession {
    StoredSession {
        credential_id: credential_id.into(),
        contract_id: "CWALLET".into(),
        connected_at: chrono::Utc::now().timestamp(),
        expires_at,
    }
}

#[tokio::test]
async fn test_new_credential_starts_pending() {
    let stored = credential("cred-1");
    assert_eq!(stored.status, DeploymentStatus::Pending);
    assert!(stored.contract_id.is_none());
    assert!(stored.deployment_error.is_none());
    assert_eq!(stored.created_at, stored.last_used_at);
}

#[tokio::test]
async fn test_crud_lifecycle() {
    let store = MemoryCredentialStore::new();
    store.save(credential("a")).await.unwrap();
    store.save(credential("b")).await.unwrap();
    assert_eq!(store.get_all().await.unwrap().len(), 2);

    store.delete("a").await.unwrap();
    assert!(store.get("a").await.unwrap().is_none());
    assert!(store.get("b").await.unwrap().is_some());

    // Deleting an absent credential is not an error
    store.delete("a").await.unwrap();

    store.clear().await.unwrap();
    assert!(store.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_deployment_record() {
    let store = MemoryCredentialStore::new();
    store.save(credential("cred-1")).await.unwrap();
    store
        .update(
            "cred-1",
            CredentialUpdate::new()
                .contract_id("CWALLET")
                .status(DeploymentStatus::Failed)
                .deployment_error("transaction failed on-chain"),
        )
        .await
        .unwrap();

    let stored = store.get("cred-1").await.unwrap().unwrap();
    assert_eq!(stored.status, DeploymentStatus::Failed);
    assert_eq!(stored.contract_id.as_deref(), Some("CWALLET"));
    assert_eq!(
        stored.deployment_error.as_deref(),
        Some("transaction failed on-chain")
    );
    // Key material untouched by the patch
    assert_eq!(stored.public_key, vec![0x04; 65]);
}

#[tokio::test]
async fn test_duplicate_and_missing_ids() {
    let store = MemoryCredentialStore::new();
    store.save(credential("cred-1")).await.unwrap();

    assert!(matches!(
        store.save(credential("cred-1")).await,
        Err(Error::CredentialExists(_))
    ));
    assert!(matches!(
        store.update("ghost", CredentialUpdate::new()).await,
        Err(Error::CredentialNotFound(_))
    ));
}

#[tokio::test]
async fn test_session_overwrite() {
    let store = MemoryCredentialStore::new();
    let far_future = chrono::Utc::now().timestamp() + 3600;
    store.save_session(session("first", far_future)).await.unwrap();
    store.save_session(session("second", far_future)).await.unwrap();

    let live = store.get_session().await.unwrap().unwrap();
    assert_eq!(live.credential_id, "second");
}

#[tokio::test]
async fn test_expired_session_reads_as_absent() {
    let store = MemoryCredentialStore::new();
    let past = chrono::Utc::now().timestamp() - 10;
    store.save_session(session("old", past)).await.unwrap();
    assert!(store.get_session().await.unwrap().is_none());
}
