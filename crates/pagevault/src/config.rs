//! Process configuration.
//!
//! Read once at startup and handed to the services. The master key is held
//! in an `Arc` and shared by reference; rotating it needs a restart.

use std::path::PathBuf;
use std::sync::Arc;

use pagevault_core::{MasterKey, RateLimitPolicy, MASTER_KEY_ENV};
use pagevault_license::{LicenseTtl, SigningSecret, LICENSE_TTL_ENV, SIGNING_SECRET_ENV};

use crate::error::{Result, VaultError};

pub const DATABASE_ENV: &str = "PAGEVAULT_DATABASE";
pub const PAGES_DIR_ENV: &str = "PAGEVAULT_PAGES_DIR";
pub const RATE_LIMIT_MAX_ENV: &str = "PAGEVAULT_RATE_LIMIT_MAX";
pub const RATE_LIMIT_WINDOW_ENV: &str = "PAGEVAULT_RATE_LIMIT_WINDOW_SECS";
pub const RATE_LIMIT_BACKEND_ENV: &str = "PAGEVAULT_RATE_LIMIT_BACKEND";

pub const DEFAULT_DATABASE: &str = "pagevault.db";
pub const DEFAULT_PAGES_DIR: &str = "secure_docs";

/// Where rate-limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitBackend {
    /// Per-process counters.
    #[default]
    Memory,
    /// Counters in the shared SQLite database.
    Sqlite,
}

impl std::str::FromStr for RateLimitBackend {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(RateLimitBackend::Memory),
            "sqlite" => Ok(RateLimitBackend::Sqlite),
            other => Err(VaultError::Configuration(format!(
                "{RATE_LIMIT_BACKEND_ENV} must be memory or sqlite, got {other:?}"
            ))),
        }
    }
}

/// Configuration for a [`crate::Vault`].
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub master_key: Arc<MasterKey>,
    pub signing_secret: SigningSecret,
    pub license_ttl: LicenseTtl,
    pub database_path: PathBuf,
    pub pages_dir: PathBuf,
    pub rate_limit: RateLimitPolicy,
    pub rate_limit_backend: RateLimitBackend,
}

impl VaultConfig {
    /// Build a configuration with defaults for everything but the secrets.
    pub fn new(master_key: MasterKey, signing_secret: SigningSecret) -> Self {
        Self {
            master_key: Arc::new(master_key),
            signing_secret,
            license_ttl: LicenseTtl::default(),
            database_path: PathBuf::from(DEFAULT_DATABASE),
            pages_dir: PathBuf::from(DEFAULT_PAGES_DIR),
            rate_limit: RateLimitPolicy::default(),
            rate_limit_backend: RateLimitBackend::default(),
        }
    }

    /// Read the configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let master_key = MasterKey::parse(&lookup(MASTER_KEY_ENV).unwrap_or_default())?;
        let signing_secret = SigningSecret::new(lookup(SIGNING_SECRET_ENV).unwrap_or_default())?;

        let mut config = Self::new(master_key, signing_secret);
        config.license_ttl = LicenseTtl::from_config(lookup(LICENSE_TTL_ENV).as_deref());

        if let Some(path) = lookup(DATABASE_ENV) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(PAGES_DIR_ENV) {
            config.pages_dir = PathBuf::from(dir);
        }

        let defaults = RateLimitPolicy::default();
        let max_requests = match lookup(RATE_LIMIT_MAX_ENV) {
            Some(raw) => parse_positive(RATE_LIMIT_MAX_ENV, &raw)?,
            None => defaults.max_requests,
        };
        let window_ms = match lookup(RATE_LIMIT_WINDOW_ENV) {
            Some(raw) => i64::from(parse_positive(RATE_LIMIT_WINDOW_ENV, &raw)?) * 1000,
            None => defaults.window_ms,
        };
        config.rate_limit = RateLimitPolicy::new(max_requests, window_ms);

        if let Some(raw) = lookup(RATE_LIMIT_BACKEND_ENV) {
            config.rate_limit_backend = raw.parse()?;
        }

        Ok(config)
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(VaultError::Configuration(format!(
            "{name} must be a positive integer"
        ))),
    }
}
