//! CLI configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BAZAAR_API_URL` - Backend base URL (see `bazaar_client::config`)
//! - `BAZAAR_STATE_DIR` - Where the signed-in user and checkout progress are kept (default: `.bazaar`)
//! - `SENTRY_DSN` - Sentry DSN for error tracking
//! - `SENTRY_ENVIRONMENT` - Environment name reported to Sentry

use std::path::PathBuf;

use bazaar_client::config::{ClientConfig, ConfigError, get_env_or_default, get_optional_env};

const DEFAULT_STATE_DIR: &str = ".bazaar";

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub client: ClientConfig,
    pub state_dir: PathBuf,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl CliConfig {
    /// Load configuration from the environment (and `.env`, when present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client = ClientConfig::from_env()?;
        Ok(Self {
            client,
            state_dir: PathBuf::from(get_env_or_default("BAZAAR_STATE_DIR", DEFAULT_STATE_DIR)),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}
