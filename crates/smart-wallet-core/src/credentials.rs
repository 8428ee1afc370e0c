//! Credential Store
//!
//! Persists locally known passkey credentials and the single reconnect
//! session. Durable wallet state lives on-chain; this store only tracks what
//! the client needs between a registration attempt and its confirmed
//! deployment, plus failure records for diagnostics. There is deliberately no
//! persisted success status: on confirmed deployment the credential record is
//! deleted.
//!
//! The default backend is in-memory and safe for concurrent callers; remote
//! backends can implement [`CredentialStore`].

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Deployment status of a registered credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Registration recorded, deployment outcome unknown
    Pending,
    /// Deployment failed; record retained for diagnostics
    Failed,
}

/// A locally known authorization credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Opaque credential identifier (store key)
    pub credential_id: String,
    /// Public key bytes, compared by content
    #[serde(with = "crate::types::bytes_hex")]
    pub public_key: Vec<u8>,
    /// Smart-wallet contract this credential deployed, once known
    pub contract_id: Option<String>,
    pub status: DeploymentStatus,
    /// Error detail for failed deployments
    pub deployment_error: Option<String>,
    /// Creation timestamp (Unix seconds)
    pub created_at: i64,
    /// Last use timestamp (Unix seconds)
    pub last_used_at: i64,
    pub nickname: Option<String>,
    pub is_primary: bool,
}

impl StoredCredential {
    /// New pending credential created at registration time
    pub fn new(credential_id: impl Into<String>, public_key: Vec<u8>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            credential_id: credential_id.into(),
            public_key,
            contract_id: None,
            status: DeploymentStatus::Pending,
            deployment_error: None,
            created_at: now,
            last_used_at: now,
            nickname: None,
            is_primary: false,
        }
    }
}

/// Sparse patch applied by [`CredentialStore::update`]
///
/// Only fields that are set change; everything else is left as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialUpdate {
    pub contract_id: Option<String>,
    pub status: Option<DeploymentStatus>,
    pub deployment_error: Option<String>,
    pub last_used_at: Option<i64>,
    pub nickname: Option<String>,
    pub is_primary: Option<bool>,
}

impl CredentialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contract_id(mut self, contract_id: impl Into<String>) -> Self {
        self.contract_id = Some(contract_id.into());
        self
    }

    pub fn status(mut self, status: DeploymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn deployment_error(mut self, error: impl Into<String>) -> Self {
        self.deployment_error = Some(error.into());
        self
    }

    pub fn last_used_at(mut self, at: i64) -> Self {
        self.last_used_at = Some(at);
        self
    }

    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn is_primary(mut self, primary: bool) -> Self {
        self.is_primary = Some(primary);
        self
    }

    fn apply(&self, credential: &mut StoredCredential) {
        if let Some(contract_id) = &self.contract_id {
            credential.contract_id = Some(contract_id.clone());
        }
        if let Some(status) = self.status {
            credential.status = status;
        }
        if let Some(error) = &self.deployment_error {
            credential.deployment_error = Some(error.clone());
        }
        if let Some(at) = self.last_used_at {
            credential.last_used_at = at;
        }
        if let Some(nickname) = &self.nickname {
            credential.nickname = Some(nickname.clone());
        }
        if let Some(primary) = self.is_primary {
            credential.is_primary = primary;
        }
    }
}

/// The single reconnect session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub credential_id: String,
    pub contract_id: String,
    /// Unix seconds
    pub connected_at: i64,
    /// Unix seconds; reads past this point treat the session as absent
    pub expires_at: i64,
}

impl StoredSession {
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() >= self.expires_at
    }
}

/// Trait for credential persistence backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store a new credential; fails with `CredentialExists` if the id is
    /// already present
    async fn save(&self, credential: StoredCredential) -> Result<()>;

    /// Apply a sparse patch; fails with `CredentialNotFound` if absent
    async fn update(&self, credential_id: &str, update: CredentialUpdate) -> Result<()>;

    async fn get(&self, credential_id: &str) -> Result<Option<StoredCredential>>;

    /// Look up the credential bound to a wallet contract
    async fn get_by_contract(&self, contract_id: &str) -> Result<Option<StoredCredential>>;

    async fn get_all(&self) -> Result<Vec<StoredCredential>>;

    async fn delete(&self, credential_id: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    async fn save_session(&self, session: StoredSession) -> Result<()>;

    /// Returns the live session, clearing and hiding an expired one
    async fn get_session(&self) -> Result<Option<StoredSession>>;

    async fn clear_session(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    credentials: HashMap<String, StoredCredential>,
    session: Option<StoredSession>,
}

/// Default in-memory, lock-guarded backend
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(&self, credential: StoredCredential) -> Result<()> {
        let mut state = self.state.write().await;
        if state.credentials.contains_key(&credential.credential_id) {
            return Err(Error::CredentialExists(credential.credential_id));
        }
        tracing::debug!(credential_id = %credential.credential_id, "saving credential");
        state
            .credentials
            .insert(credential.credential_id.clone(), credential);
        Ok(())
    }

    async fn update(&self, credential_id: &str, update: CredentialUpdate) -> Result<()> {
        let mut state = self.state.write().await;
        let credential = state
            .credentials
            .get_mut(credential_id)
            .ok_or_else(|| Error::CredentialNotFound(credential_id.to_string()))?;
        update.apply(credential);
        Ok(())
    }

    async fn get(&self, credential_id: &str) -> Result<Option<StoredCredential>> {
        let state = self.state.read().await;
        Ok(state.credentials.get(credential_id).cloned())
    }

    async fn get_by_contract(&self, contract_id: &str) -> Result<Option<StoredCredential>> {
        let state = self.state.read().await;
        Ok(state
            .credentials
            .values()
            .find(|c| c.contract_id.as_deref() == Some(contract_id))
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<StoredCredential>> {
        let state = self.state.read().await;
        Ok(state.credentials.values().cloned().collect())
    }

    async fn delete(&self, credential_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.credentials.remove(credential_id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.credentials.clear();
        Ok(())
    }

    async fn save_session(&self, session: StoredSession) -> Result<()> {
        let mut state = self.state.write().await;
        state.session = Some(session);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<StoredSession>> {
        let mut state = self.state.write().await;
        if let Some(session) = &state.session {
            if session.is_expired() {
                tracing::debug!("clearing expired session");
                state.session = None;
            }
        }
        Ok(state.session.clone())
    }

    async fn clear_session(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.session = None;
        Ok(())
    }
}
