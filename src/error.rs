//! Error taxonomy for store operations.
//!
//! Every public operation on the credential manager, content repository and
//! review subsystem returns a [`StoreResult`]. Failures are local to the call
//! and never leave a partial write behind; see [`crate::store::Store::commit`].

use crate::store::kv::KvError;
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the account, catalog and review operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed input. The caller corrects it and retries.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An account with this email already exists.
    #[error("an account with email '{email}' already exists")]
    Conflict { email: String },

    /// The operation needs a signed-in session.
    #[error("not signed in")]
    Authentication,

    /// The current session lacks the required role.
    #[error("this action requires the {required} role")]
    Authorization { required: &'static str },

    /// Login is locked after repeated failures.
    #[error("too many failed attempts, try again in {retry_after_secs}s")]
    Locked { retry_after_secs: u64 },

    /// Unknown email or wrong password. The two are deliberately not told apart.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The referenced item does not exist.
    #[error("item not found: {id}")]
    NotFound { id: String },

    /// The backing store failed. Not recoverable by the caller.
    #[error(transparent)]
    Storage(#[from] KvError),
}

impl StoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Whether the user can get past this error without a privilege change or
    /// operator intervention.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Authorization { .. } | Self::Storage(_))
    }
}
