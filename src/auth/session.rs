//! The single active session.

use crate::error::{StoreError, StoreResult};
use crate::model::{Role, Session};
use crate::store::Store;
use std::sync::Arc;

/// Read access to the current session plus logout.
///
/// Sessions are created by [`crate::auth::CredentialManager`] on register and
/// login; this controller never builds one itself.
#[derive(Clone)]
pub struct SessionController {
    store: Arc<Store>,
}

impl SessionController {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn current(&self) -> Option<Session> {
        self.store.read(|s| s.session.clone())
    }

    pub fn is_admin(&self) -> bool {
        self.store
            .read(|s| matches!(&s.session, Some(session) if session.role == Role::Admin))
    }

    /// Clear the session and persist. Signing out when nobody is signed in is
    /// a no-op.
    pub fn logout(&self) -> StoreResult<()> {
        let previous = self.store.commit(|s| Ok(s.session.take()))?;
        if let Some(session) = previous {
            tracing::info!(user_id = %session.id, "Signed out");
        }
        Ok(())
    }

    /// Current session or [`StoreError::Authentication`].
    pub fn require(&self) -> StoreResult<Session> {
        self.current().ok_or(StoreError::Authentication)
    }

    /// Succeed only for an admin session.
    pub fn require_admin(&self) -> StoreResult<Session> {
        match self.current() {
            Some(session) if session.role == Role::Admin => Ok(session),
            _ => Err(StoreError::Authorization {
                required: Role::Admin.as_str(),
            }),
        }
    }
}
