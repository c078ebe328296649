//! Wiring: one [`Store`] shared by every component.

use crate::auth::{CredentialManager, SessionController};
use crate::catalog::{ContentRepository, ReviewService};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::StoreResult;
use crate::security::LockoutMonitor;
use crate::store::kv::{KeyValueStore, SqliteKv};
use crate::store::{Store, StoreEvent};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All components over a single store.
pub struct App {
    store: Arc<Store>,
    pub credentials: CredentialManager,
    pub sessions: SessionController,
    pub lockout: Arc<LockoutMonitor>,
    pub items: ContentRepository,
    pub reviews: ReviewService,
}

impl App {
    /// Open the SQLite database named by `config` with the system clock.
    pub fn open(config: &Config) -> Result<Self> {
        let db_path = config.db_path()?;
        let kv = SqliteKv::open(&db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        tracing::debug!(path = %db_path.display(), "Opened database");
        Self::with_backend(config, Arc::new(kv), Arc::new(SystemClock))
            .context("Failed to initialise store")
    }

    /// Build on an arbitrary backend and clock.
    pub fn with_backend(
        config: &Config,
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let store = Arc::new(Store::open(kv)?);
        let sessions = SessionController::new(store.clone());
        let lockout = Arc::new(LockoutMonitor::new(
            store.clone(),
            clock.clone(),
            &config.lockout,
        ));
        let credentials = CredentialManager::new(
            store.clone(),
            lockout.clone(),
            clock.clone(),
            config.security.scheme(),
            config.accounts.clone(),
        );
        let items = ContentRepository::new(store.clone(), sessions.clone());
        let reviews = ReviewService::new(store.clone(), sessions.clone(), clock);

        if config.seed.default_items {
            items.seed_if_empty()?;
        }

        Ok(Self {
            store,
            credentials,
            sessions,
            lockout,
            items,
            reviews,
        })
    }

    /// Change notifications for UI layers.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }
}
