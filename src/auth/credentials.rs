//! Registration and login.
//!
//! Users are kept in the `users` collection of the shared [`Store`]; each one
//! carries its own random salt and the scheme its hash was produced with.
//! Unknown emails and wrong passwords fail the same way, and unknown emails
//! still pay for one digest so timing does not tell them apart.

use crate::auth::session::SessionController;
use crate::clock::Clock;
use crate::config::AccountsConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::{new_id, Role, Session, User};
use crate::security::hashing::{self, HashScheme};
use crate::security::lockout::LockoutMonitor;
use crate::security::sanitize::{char_len, is_email_shaped, mask_email, sanitize};
use crate::store::Store;
use std::sync::Arc;

/// Minimum display-name length (characters, after sanitization).
const MIN_DISPLAY_NAME: usize = 2;

/// Minimum password length.
const MIN_PASSWORD: usize = 8;

/// Owner of the user collection.
pub struct CredentialManager {
    store: Arc<Store>,
    lockout: Arc<LockoutMonitor>,
    clock: Arc<dyn Clock>,
    scheme: HashScheme,
    accounts: AccountsConfig,
}

impl CredentialManager {
    pub fn new(
        store: Arc<Store>,
        lockout: Arc<LockoutMonitor>,
        clock: Arc<dyn Clock>,
        scheme: HashScheme,
        accounts: AccountsConfig,
    ) -> Self {
        Self {
            store,
            lockout,
            clock,
            scheme,
            accounts,
        }
    }

    // ── Registration ────────────────────────────────────────────────

    /// Create an account and sign it in.
    pub fn register(&self, display_name: &str, email: &str, password: &str) -> StoreResult<Session> {
        let display_name = sanitize(display_name);
        let email = normalize_email(email);

        if !is_email_shaped(&email) {
            return Err(StoreError::validation("email must look like name@domain.tld"));
        }
        if char_len(&display_name) < MIN_DISPLAY_NAME {
            return Err(StoreError::validation(format!(
                "display name must be at least {MIN_DISPLAY_NAME} characters"
            )));
        }
        check_password_policy(password)?;

        let salt = hashing::generate_salt();
        let password_hash = hashing::hash_password(self.scheme, password, &salt);
        let role = if self.accounts.is_admin_email(&email) {
            Role::Admin
        } else {
            Role::User
        };
        let user = User {
            id: new_id(),
            display_name,
            email,
            role,
            salt,
            password_hash,
            scheme: self.scheme,
            created_at: self.clock.now(),
        };

        let session = self.store.commit(|s| {
            if s.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
                return Err(StoreError::Conflict {
                    email: user.email.clone(),
                });
            }
            let session = Session::from(&user);
            s.users.push(user.clone());
            s.session = Some(session.clone());
            Ok(session)
        })?;

        tracing::info!(
            user_id = %session.id,
            email = %mask_email(&session.email),
            role = %session.role,
            "Registered user"
        );
        Ok(session)
    }

    // ── Login ───────────────────────────────────────────────────────

    /// Verify credentials and sign the user in.
    pub fn login(&self, email: &str, password: &str) -> StoreResult<Session> {
        // Attempts during the lock window are rejected without being counted.
        self.lockout.check()?;

        let email = normalize_email(email);
        let user = self
            .store
            .read(|s| s.users.iter().find(|u| u.email == email).cloned());

        let verified = match &user {
            Some(u) => hashing::verify_password(u.scheme, password, &u.salt, &u.password_hash),
            None => {
                let _ = hashing::hash_password(self.scheme, password, hashing::DECOY_SALT);
                false
            }
        };

        let Some(user) = user.filter(|_| verified) else {
            // Another attempt may have engaged the lock since `check`; the
            // count re-checks it under the store lock.
            self.lockout.record_failure()?;
            tracing::warn!(email = %mask_email(&email), "Login rejected");
            return Err(StoreError::InvalidCredentials);
        };

        let session = self.store.commit(|s| {
            self.lockout.admit(&mut s.lock)?;
            let session = Session::from(&user);
            s.session = Some(session.clone());
            Ok(session)
        })?;

        tracing::info!(user_id = %session.id, role = %session.role, "Signed in");
        Ok(session)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Number of registered users.
    pub fn user_count(&self) -> usize {
        self.store.read(|s| s.users.len())
    }

    /// Look up a user by email (case-insensitive).
    pub fn find_user(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        self.store
            .read(|s| s.users.iter().find(|u| u.email == email).cloned())
    }

    /// Session controller over the same store.
    pub fn sessions(&self) -> SessionController {
        SessionController::new(self.store.clone())
    }
}

/// Sanitized, trimmed, lower-cased email.
pub fn normalize_email(email: &str) -> String {
    sanitize(email).to_lowercase()
}

/// Length ≥ 8 with at least one uppercase, one lowercase and one digit.
pub fn check_password_policy(password: &str) -> StoreResult<()> {
    let long_enough = password.chars().count() >= MIN_PASSWORD;
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_upper && has_lower && has_digit {
        Ok(())
    } else {
        Err(StoreError::validation(format!(
            "password must be at least {MIN_PASSWORD} characters and contain an uppercase letter, a lowercase letter and a digit"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LockoutConfig;
    use crate::store::kv::{KeyValueStore, MemoryKv};
    use chrono::Duration;

    struct Fixture {
        kv: Arc<MemoryKv>,
        clock: Arc<ManualClock>,
        lockout: Arc<LockoutMonitor>,
        creds: CredentialManager,
    }

    fn fixture_with(scheme: HashScheme) -> Fixture {
        let kv = Arc::new(MemoryKv::new());
        let store = Arc::new(Store::open(kv.clone()).unwrap());
        let clock = Arc::new(ManualClock::default());
        let lockout = Arc::new(LockoutMonitor::new(
            store.clone(),
            clock.clone(),
            &LockoutConfig::default(),
        ));
        let creds = CredentialManager::new(
            store,
            lockout.clone(),
            clock.clone(),
            scheme,
            AccountsConfig::default(),
        );
        Fixture {
            kv,
            clock,
            lockout,
            creds,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(HashScheme::Sha256)
    }

    #[test]
    fn register_normalizes_and_signs_in() {
        let f = fixture();

        let session = f.creds.register("Ann", "Ann@X.com", "Abcdef12").unwrap();
        assert_eq!(session.role, Role::User);
        assert_eq!(session.email, "ann@x.com");
        assert_eq!(session.display_name, "Ann");
        assert_eq!(f.creds.sessions().current(), Some(session.clone()));

        let user = f.creds.find_user("ANN@x.com").unwrap();
        assert_eq!(user.email, "ann@x.com");
        assert_eq!(user.id, session.id);
        assert_eq!(user.password_hash, hashing::digest("Abcdef12", &user.salt));
        assert!(f.kv.get("users.v1").unwrap().is_some());
        assert!(f.kv.get("session.v1").unwrap().is_some());
    }

    #[test]
    fn register_admin_email_gets_admin_role() {
        let f = fixture();
        let session = f
            .creds
            .register("Administrator", "Admin@Demo.Local", "Adminpass1")
            .unwrap();
        assert_eq!(session.role, Role::Admin);
        assert!(f.creds.sessions().is_admin());
    }

    #[test]
    fn register_duplicate_email_any_case_conflicts() {
        let f = fixture();
        f.creds.register("Ann", "ann@x.com", "Abcdef12").unwrap();

        let err = f.creds.register("Other", "ANN@X.COM", "Zyxwvu98").unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(f.creds.user_count(), 1);
    }

    #[test]
    fn register_conflict_keeps_existing_session() {
        let f = fixture();
        let first = f.creds.register("Ann", "ann@x.com", "Abcdef12").unwrap();
        let _ = f.creds.register("Ann", "ann@x.com", "Abcdef12");
        assert_eq!(f.creds.sessions().current(), Some(first));
    }

    #[test]
    fn register_rejects_bad_email() {
        let f = fixture();
        for email in ["ann", "ann@x", "a b@x.com", ""] {
            let err = f.creds.register("Ann", email, "Abcdef12").unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)), "{email}");
        }
        assert_eq!(f.creds.user_count(), 0);
    }

    #[test]
    fn register_rejects_short_display_name() {
        let f = fixture();
        let err = f.creds.register(" A ", "a@x.com", "Abcdef12").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        let err = f.creds.register("<b></b>", "a@x.com", "Abcdef12").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn password_policy() {
        assert!(check_password_policy("Abcdef12").is_ok());
        assert!(check_password_policy("Abcde12").is_err()); // too short
        assert!(check_password_policy("abcdef12").is_err()); // no upper
        assert!(check_password_policy("ABCDEF12").is_err()); // no lower
        assert!(check_password_policy("Abcdefgh").is_err()); // no digit
    }

    #[test]
    fn register_weak_password_fails() {
        let f = fixture();
        let err = f.creds.register("Ann", "ann@x.com", "password").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(f.creds.sessions().current().is_none());
    }

    #[test]
    fn login_success_replaces_session_and_resets_lock() {
        let f = fixture();
        f.creds.register("Ann", "ann@x.com", "Abcdef12").unwrap();
        f.creds.register("Bob", "bob@x.com", "Bobpass99").unwrap();

        f.creds.login("ann@x.com", "wrong").unwrap_err();
        assert_eq!(f.lockout.lock_state().fails, 1);

        let session = f.creds.login(" ANN@x.com ", "Abcdef12").unwrap();
        assert_eq!(session.display_name, "Ann");
        assert_eq!(f.creds.sessions().current().unwrap().id, session.id);
        assert_eq!(f.lockout.lock_state().fails, 0);
    }

    #[test]
    fn unknown_email_and_wrong_password_look_the_same() {
        let f = fixture();
        f.creds.register("Ann", "ann@x.com", "Abcdef12").unwrap();

        let a = f.creds.login("ghost@x.com", "Abcdef12").unwrap_err();
        let b = f.creds.login("ann@x.com", "Wrong1234").unwrap_err();
        assert!(matches!(a, StoreError::InvalidCredentials));
        assert!(matches!(b, StoreError::InvalidCredentials));
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(f.lockout.lock_state().fails, 2);
    }

    #[test]
    fn failed_login_does_not_touch_session() {
        let f = fixture();
        let session = f.creds.register("Ann", "ann@x.com", "Abcdef12").unwrap();
        f.creds.login("ann@x.com", "nope").unwrap_err();
        assert_eq!(f.creds.sessions().current(), Some(session));
    }

    #[test]
    fn lockout_after_three_failures_then_recovers() {
        let f = fixture();
        f.creds.register("Ann", "ann@x.com", "Abcdef12").unwrap();
        f.creds.sessions().logout().unwrap();

        for _ in 0..3 {
            let err = f.creds.login("ann@x.com", "Wrong1234").unwrap_err();
            assert!(matches!(err, StoreError::InvalidCredentials));
        }

        let err = f.creds.login("ann@x.com", "Abcdef12").unwrap_err();
        assert!(matches!(err, StoreError::Locked { .. }));
        // rejected while locked, not counted
        assert_eq!(f.lockout.lock_state().fails, 3);
        assert!(f.creds.sessions().current().is_none());

        f.clock.advance(Duration::seconds(60));
        let session = f.creds.login("ann@x.com", "Abcdef12").unwrap();
        assert_eq!(session.email, "ann@x.com");
        assert_eq!(f.lockout.lock_state().fails, 0);
        assert_eq!(f.lockout.lock_state().until, 0);
    }

    #[test]
    fn concurrent_guesses_stop_at_threshold() {
        use std::sync::Barrier;

        let f = Arc::new(fixture());
        f.creds.register("Ann", "ann@x.com", "Abcdef12").unwrap();
        f.creds.sessions().logout().unwrap();

        let barrier = Arc::new(Barrier::new(32));
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let f = f.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    f.creds.login("ann@x.com", &format!("Wrong{i}X"))
                })
            })
            .collect();

        let mut invalid = 0;
        let mut locked = 0;
        for h in handles {
            match h.join().unwrap() {
                Err(StoreError::InvalidCredentials) => invalid += 1,
                Err(StoreError::Locked { .. }) => locked += 1,
                other => panic!("unexpected login result: {other:?}"),
            }
        }
        assert_eq!(invalid, 3);
        assert_eq!(locked, 29);
        assert_eq!(f.lockout.lock_state().fails, 3);
    }

    #[test]
    fn pbkdf2_users_verify_after_scheme_change() {
        let kv = Arc::new(MemoryKv::new());
        let clock: Arc<ManualClock> = Arc::new(ManualClock::default());

        {
            let store = Arc::new(Store::open(kv.clone()).unwrap());
            let lockout = Arc::new(LockoutMonitor::new(
                store.clone(),
                clock.clone(),
                &LockoutConfig::default(),
            ));
            let creds = CredentialManager::new(
                store,
                lockout,
                clock.clone(),
                HashScheme::Pbkdf2 { rounds: 50 },
                AccountsConfig::default(),
            );
            creds.register("Ann", "ann@x.com", "Abcdef12").unwrap();
            assert_eq!(
                creds.find_user("ann@x.com").unwrap().scheme,
                HashScheme::Pbkdf2 { rounds: 50 }
            );
        }

        // reopen with the default scheme: the stored user still logs in
        let store = Arc::new(Store::open(kv).unwrap());
        let lockout = Arc::new(LockoutMonitor::new(
            store.clone(),
            clock.clone(),
            &LockoutConfig::default(),
        ));
        let creds = CredentialManager::new(
            store,
            lockout,
            clock,
            HashScheme::Sha256,
            AccountsConfig::default(),
        );
        assert!(creds.login("ann@x.com", "Abcdef12").is_ok());
    }

    #[test]
    fn storage_failure_on_register_leaves_no_user() {
        let f = fixture();
        f.kv.fail_writes(true);
        let err = f.creds.register("Ann", "ann@x.com", "Abcdef12").unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(f.creds.user_count(), 0);
        assert!(f.creds.sessions().current().is_none());
    }
}
