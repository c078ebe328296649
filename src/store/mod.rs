//! Shared application state with write-through persistence.
//!
//! A [`Store`] owns the four persisted collections (users, current session,
//! items, lock state) and is handed to every component as `Arc<Store>`.
//! Mutations go through [`Store::commit`], which runs in three explicit steps:
//!
//! 1. apply the change to a draft copy of the state
//! 2. write every key whose value changed to the backing store
//! 3. publish the draft as the new in-memory state and notify subscribers
//!
//! A failure in step 1 or 2 leaves the in-memory state untouched.

pub mod kv;

use crate::error::StoreResult;
use crate::model::{Item, LockState, Session, User};
use kv::{get_or, KeyValueStore, KvError};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the change-notification channel.
const EVENT_CAPACITY: usize = 64;

/// Logical keys in the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Users,
    Session,
    Items,
    Lock,
}

impl StoreKey {
    pub const ALL: [Self; 4] = [Self::Users, Self::Items, Self::Lock, Self::Session];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users.v1",
            Self::Session => "session.v1",
            Self::Items => "items.v2",
            Self::Lock => "lock.v1",
        }
    }
}

/// In-memory view of everything persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub session: Option<Session>,
    /// Most recent first.
    pub items: Vec<Item>,
    pub lock: LockState,
}

impl Snapshot {
    fn value_of(&self, key: StoreKey) -> Result<Value, KvError> {
        let value = match key {
            StoreKey::Users => serde_json::to_value(&self.users)?,
            StoreKey::Session => serde_json::to_value(&self.session)?,
            StoreKey::Items => serde_json::to_value(&self.items)?,
            StoreKey::Lock => serde_json::to_value(self.lock)?,
        };
        Ok(value)
    }

    fn changed_keys(&self, next: &Self) -> Vec<StoreKey> {
        StoreKey::ALL
            .into_iter()
            .filter(|key| match key {
                StoreKey::Users => self.users != next.users,
                StoreKey::Session => self.session != next.session,
                StoreKey::Items => self.items != next.items,
                StoreKey::Lock => self.lock != next.lock,
            })
            .collect()
    }
}

/// Change notification published after every successful commit.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    UsersChanged,
    SessionChanged(Option<Session>),
    ItemsChanged,
    LockChanged(LockState),
}

/// Shared state handle.
pub struct Store {
    kv: Arc<dyn KeyValueStore>,
    state: Mutex<Snapshot>,
    events: broadcast::Sender<StoreEvent>,
}

impl Store {
    /// Load all collections from the backing store. Missing or undecodable
    /// keys start out empty.
    pub fn open(kv: Arc<dyn KeyValueStore>) -> Result<Self, KvError> {
        let snapshot = Snapshot {
            users: get_or(kv.as_ref(), StoreKey::Users.as_str(), Vec::new())?,
            session: get_or(kv.as_ref(), StoreKey::Session.as_str(), None)?,
            items: get_or(kv.as_ref(), StoreKey::Items.as_str(), Vec::new())?,
            lock: get_or(kv.as_ref(), StoreKey::Lock.as_str(), LockState::default())?,
        };
        tracing::debug!(
            users = snapshot.users.len(),
            items = snapshot.items.len(),
            signed_in = snapshot.session.is_some(),
            "Loaded store"
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            kv,
            state: Mutex::new(snapshot),
            events,
        })
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Run a read-only query against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        f(&self.state.lock())
    }

    /// Apply a mutation, persist what changed, then publish it.
    ///
    /// `f` works on a draft; if it returns an error nothing is written and
    /// the live state is unchanged. The state lock is held for the whole
    /// commit, so check-then-insert sequences inside `f` cannot interleave.
    pub fn commit<R>(&self, f: impl FnOnce(&mut Snapshot) -> StoreResult<R>) -> StoreResult<R> {
        let mut state = self.state.lock();
        let mut draft = state.clone();
        let out = f(&mut draft)?;

        let changed = state.changed_keys(&draft);
        self.persist(&state, &draft, &changed)?;
        *state = draft;

        for key in &changed {
            let event = match key {
                StoreKey::Users => StoreEvent::UsersChanged,
                StoreKey::Session => StoreEvent::SessionChanged(state.session.clone()),
                StoreKey::Items => StoreEvent::ItemsChanged,
                StoreKey::Lock => StoreEvent::LockChanged(state.lock),
            };
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        Ok(out)
    }

    /// Write `changed` keys from `next`. On failure, keys already written are
    /// put back to their `prev` values before the error is returned.
    fn persist(&self, prev: &Snapshot, next: &Snapshot, changed: &[StoreKey]) -> Result<(), KvError> {
        for (i, key) in changed.iter().enumerate() {
            let result = next
                .value_of(*key)
                .and_then(|value| self.kv.set(key.as_str(), &value));
            if let Err(e) = result {
                tracing::error!(key = key.as_str(), "Write-through failed: {e}");
                for done in changed.iter().take(i) {
                    let restored = prev
                        .value_of(*done)
                        .and_then(|value| self.kv.set(done.as_str(), &value));
                    if let Err(re) = restored {
                        tracing::error!(key = done.as_str(), "Rollback write failed: {re}");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}
