//! Error types for smart-wallet operations

use thiserror::Error;

/// Result type alias for smart-wallet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during smart-wallet operations
///
/// Local validation, configuration, and credential-store failures are raised
/// to the caller as `Err`. Network and on-chain outcomes of state-changing
/// calls are not: the submission pipeline folds them into a failed
/// [`crate::TransactionResult`] instead, because an on-chain rejection is an
/// expected outcome the caller must branch on.
#[derive(Debug, Error)]
pub enum Error {
    // ============ Local Errors (raised to the caller) ============
    /// Input failed shape or bounds validation before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or malformed configuration field, surfaced at construction time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential already present in the store
    #[error("Credential already exists: {0}")]
    CredentialExists(String),

    /// Credential not present in the store
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    // ============ Pipeline Errors (folded into TransactionResult) ============
    /// Network-reported simulation error; `context` distinguishes the
    /// initial pass from the post-signing re-simulation
    #[error("Simulation failed ({context}): {message}")]
    Simulation { context: String, message: String },

    /// Network rejected the final envelope
    #[error("Submission failed: {0}")]
    Submission(String),

    /// External authenticator failed to produce an assertion
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The user declined or cancelled the authentication ceremony
    #[error("User cancelled authentication")]
    UserCancelled,

    /// Confirmation polling exhausted without a definitive status
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Transport-level failure talking to the RPC, sponsor, or faucet
    #[error("Network error: {0}")]
    Network(String),

    // ============ Serialization Errors ============
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Simulation failure with a pass label ("simulate" or "re-simulate")
    pub fn simulation(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Simulation {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Whether this error must be raised to the caller rather than folded
    /// into a failed transaction result
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::Config(_)
                | Error::CredentialExists(_)
                | Error::CredentialNotFound(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}
