//! Configuration loading.
//!
//! The config file is optional: a missing file yields [`Config::default`].
//! Every section is `#[serde(default)]`, so partial files only override what
//! they name.

pub mod schema;

pub use schema::{
    AccountsConfig, Config, LockoutConfig, LoggingConfig, SecurityConfig, SeedConfig,
    StorageConfig,
};

use crate::security::lockout::MAX_WINDOW_SECS;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Config file name inside the platform config directory.
pub const CONFIG_FILE: &str = "eventfolio.toml";


fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "eventfolio", "eventfolio")
}

/// Default location of the config file.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    bail!("Config file not found: {}", p.display());
                }
                p.to_path_buf()
            }
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lockout.threshold == 0 {
            bail!("lockout.threshold must be at least 1");
        }
        if self.lockout.window_secs == 0 {
            bail!("lockout.window_secs must be at least 1");
        }
        if self.lockout.window_secs > MAX_WINDOW_SECS {
            bail!("lockout.window_secs must not exceed {MAX_WINDOW_SECS}");
        }
        if self.security.pbkdf2_rounds == 0 {
            bail!("security.pbkdf2_rounds must be at least 1");
        }
        if self.storage.db_file.trim().is_empty() {
            bail!("storage.db_file cannot be empty");
        }
        Ok(())
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => {
                let expanded = shellexpand::full(dir)
                    .with_context(|| format!("Failed to expand storage.data_dir '{dir}'"))?;
                Ok(PathBuf::from(expanded.as_ref()))
            }
            None => project_dirs()
                .map(|dirs| dirs.data_dir().to_path_buf())
                .context("Could not determine a data directory; set storage.data_dir"),
        }
    }

    /// Resolved database path.
    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.storage.db_file))
    }

    /// JSON Schema of the config file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Config)).unwrap_or_default()
    }
}
