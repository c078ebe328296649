use crate::security::hashing::{HashScheme, HashSchemeKind};
use crate::security::lockout::{DEFAULT_THRESHOLD, DEFAULT_WINDOW_SECS};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default database file name inside the data directory.
pub const DEFAULT_DB_FILE: &str = "eventfolio.db";

/// Default PBKDF2 iteration count.
pub const DEFAULT_PBKDF2_ROUNDS: u32 = 100_000;

/// Email that is granted the admin role on registration unless configured otherwise.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@demo.local";

/// Top-level configuration, read from `eventfolio.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub lockout: LockoutConfig,
    pub security: SecurityConfig,
    pub accounts: AccountsConfig,
    pub seed: SeedConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the database. `~` and `$VARS` are expanded.
    /// Defaults to the platform data directory.
    pub data_dir: Option<String>,
    /// Database file name inside `data_dir`.
    pub db_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_file: DEFAULT_DB_FILE.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct LockoutConfig {
    /// Consecutive failures that engage the lock.
    pub threshold: u32,
    /// Length of the cool-down window in seconds.
    pub window_secs: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Scheme used for newly registered passwords.
    pub hash_scheme: HashSchemeKind,
    /// Iterations when `hash_scheme = "pbkdf2"`.
    pub pbkdf2_rounds: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            hash_scheme: HashSchemeKind::Sha256,
            pbkdf2_rounds: DEFAULT_PBKDF2_ROUNDS,
        }
    }
}

impl SecurityConfig {
    pub fn scheme(&self) -> HashScheme {
        match self.hash_scheme {
            HashSchemeKind::Sha256 => HashScheme::Sha256,
            HashSchemeKind::Pbkdf2 => HashScheme::Pbkdf2 {
                rounds: self.pbkdf2_rounds,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AccountsConfig {
    /// Emails (case-insensitive) that register with the admin role.
    pub admin_emails: Vec<String>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            admin_emails: vec![DEFAULT_ADMIN_EMAIL.into()],
        }
    }
}

impl AccountsConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|e| e.trim().eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SeedConfig {
    /// Populate the catalog with starter items when it is empty.
    pub default_items: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            default_items: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter used when `EVENTFOLIO_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}
