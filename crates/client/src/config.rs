//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BAZAAR_API_URL` - Base URL of the marketplace backend (default: `http://localhost:8080`)
//! - `BAZAAR_PRODUCT_CACHE_TTL_SECS` - Product cache lifetime in seconds (default: 300)

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default backend location, matching the marketplace's development server.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Marketplace client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL; request paths such as `/api/cart/1` are appended to it.
    pub api_base_url: Url,
    /// How long catalog reads stay cached.
    pub product_cache_ttl: Duration,
}

impl ClientConfig {
    /// Configuration pointing at `api_base_url` with default cache settings.
    #[must_use]
    pub const fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            product_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_api_url(&get_env_or_default("BAZAAR_API_URL", DEFAULT_API_URL))?;
        let ttl_secs = get_env_or_default(
            "BAZAAR_PRODUCT_CACHE_TTL_SECS",
            &DEFAULT_CACHE_TTL_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("BAZAAR_PRODUCT_CACHE_TTL_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url,
            product_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

/// Parse and sanity-check a backend base URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unparseable URLs and for schemes
/// other than `http`/`https`.
pub fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("BAZAAR_API_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "BAZAAR_API_URL".to_string(),
            format!("unsupported scheme: {}", url.scheme()),
        ));
    }
    Ok(url)
}

/// Read a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if the variable is unset.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Read an environment variable, falling back to `default`.
#[must_use]
pub fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional environment variable, treating empty values as unset.
#[must_use]
pub fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_url_accepts_http() {
        let url = parse_api_url(" http://localhost:8080 ").unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn test_parse_api_url_rejects_other_schemes() {
        let err = parse_api_url("ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "BAZAAR_API_URL"));
        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn test_new_uses_default_cache_ttl() {
        let config = ClientConfig::new(Url::parse(DEFAULT_API_URL).unwrap());
        assert_eq!(config.product_cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_missing_required_env() {
        let err = get_required_env("BAZAAR_TEST_SURELY_UNSET_VARIABLE").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
        assert_eq!(get_optional_env("BAZAAR_TEST_SURELY_UNSET_VARIABLE"), None);
    }
}
