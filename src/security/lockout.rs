//! Brute-force lockout for the login path.
//!
//! Two states over the persisted [`LockState`]:
//! - UNLOCKED: `until == 0` or `now >= until`
//! - LOCKED: `now < until`
//!
//! Every counted failure bumps `fails`; once `fails` reaches the threshold the
//! failure also sets `until = now + window`. Attempts made while LOCKED are
//! rejected before they are counted, and the check runs inside the same
//! store commit as the count. A successful login resets to `{0, 0}`.
//! There is no unlock operation besides time passing.

use crate::clock::Clock;
use crate::config::LockoutConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::LockState;
use crate::store::Store;
use chrono::Duration;
use std::sync::Arc;

/// Default: lock after 3 consecutive failures.
pub const DEFAULT_THRESHOLD: u32 = 3;

/// Default cool-down window: 60 seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Upper bound on the cool-down window (one week).
pub const MAX_WINDOW_SECS: u64 = 7 * 24 * 3600;

/// Gate in front of credential checks.
pub struct LockoutMonitor {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    threshold: u32,
    window: Duration,
}

impl LockoutMonitor {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, config: &LockoutConfig) -> Self {
        let window_secs = config.window_secs.clamp(1, MAX_WINDOW_SECS);
        Self {
            store,
            clock,
            threshold: config.threshold.max(1),
            window: Duration::seconds(window_secs as i64),
        }
    }

    /// Current persisted lock state.
    pub fn lock_state(&self) -> LockState {
        self.store.read(|s| s.lock)
    }

    /// Whether logins are currently rejected.
    pub fn is_locked(&self) -> bool {
        self.remaining_ms(self.lock_state()) > 0
    }

    /// Seconds until logins are accepted again (0 when unlocked).
    pub fn retry_after_secs(&self) -> u64 {
        Self::secs_ceil(self.remaining_ms(self.lock_state()))
    }

    /// Fail with [`StoreError::Locked`] while the window is open.
    pub fn check(&self) -> StoreResult<()> {
        self.ensure_unlocked(&self.lock_state())
    }

    /// Count one failed attempt and persist it. Returns `true` if this
    /// failure engaged the lock, or [`StoreError::Locked`] without counting
    /// when another attempt locked it first.
    pub fn record_failure(&self) -> StoreResult<bool> {
        self.store.commit(|s| {
            self.ensure_unlocked(&s.lock)?;
            Ok(self.apply_failure(&mut s.lock))
        })
    }

    /// Clear the failure count on a draft lock state after a good password.
    /// Refuses while locked so a racing success cannot lift an active lock.
    pub(crate) fn admit(&self, lock: &mut LockState) -> StoreResult<()> {
        self.ensure_unlocked(lock)?;
        *lock = LockState::default();
        Ok(())
    }

    fn ensure_unlocked(&self, lock: &LockState) -> StoreResult<()> {
        let ms = self.remaining_ms(*lock);
        if ms > 0 {
            return Err(StoreError::Locked {
                retry_after_secs: Self::secs_ceil(ms),
            });
        }
        Ok(())
    }

    fn apply_failure(&self, lock: &mut LockState) -> bool {
        lock.fails = lock.fails.saturating_add(1);
        if lock.fails >= self.threshold {
            lock.until = (self.clock.now() + self.window).timestamp_millis();
            tracing::warn!(
                fails = lock.fails,
                window_secs = self.window.num_seconds(),
                "Login locked after repeated failures"
            );
            return true;
        }
        tracing::warn!(fails = lock.fails, threshold = self.threshold, "Failed login attempt");
        false
    }

    fn secs_ceil(ms: i64) -> u64 {
        u64::try_from(ms).unwrap_or_default().div_ceil(1000)
    }

    fn remaining_ms(&self, lock: LockState) -> i64 {
        if lock.until == 0 {
            return 0;
        }
        (lock.until - self.clock.now_millis()).max(0)
    }
}
