//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FERNMART_API_BASE_URL` - Base URL of the commerce API
//!
//! ## Optional
//! - `FERNMART_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `FERNMART_TOKEN_FILE` - Path of the persisted auth token file
//!   (default: unset, token is held in memory only)
//! - `FERNMART_PRODUCT_CACHE_TTL_SECS` - Product detail cache TTL
//!   (default: 300)
//! - `FERNMART_PRODUCT_CACHE_CAPACITY` - Product detail cache entries
//!   (default: 1000)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the commerce API
    pub api_base_url: Url,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Persisted auth token file, if any
    pub token_file: Option<PathBuf>,
    /// Product detail cache TTL
    pub product_cache_ttl: Duration,
    /// Product detail cache capacity (entries)
    pub product_cache_capacity: u64,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(&get_required_env("FERNMART_API_BASE_URL")?)?;
        let request_timeout = Duration::from_secs(get_parsed_or_default(
            "FERNMART_REQUEST_TIMEOUT_SECS",
            30,
        )?);
        let token_file = get_optional_env("FERNMART_TOKEN_FILE").map(PathBuf::from);
        let product_cache_ttl = Duration::from_secs(get_parsed_or_default(
            "FERNMART_PRODUCT_CACHE_TTL_SECS",
            300,
        )?);
        let product_cache_capacity =
            get_parsed_or_default("FERNMART_PRODUCT_CACHE_CAPACITY", 1000)?;

        Ok(Self {
            api_base_url,
            request_timeout,
            token_file,
            product_cache_ttl,
            product_cache_capacity,
        })
    }

    /// Build a configuration against a known base URL with defaults
    /// everywhere else. Used by tests and the CLI's `--api-url` override.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL does not parse.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url(base_url)?,
            request_timeout: Duration::from_secs(30),
            token_file: None,
            product_cache_ttl: Duration::from_secs(300),
            product_cache_capacity: 1000,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and sanity-check the API base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("FERNMART_API_BASE_URL".to_owned(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "FERNMART_API_BASE_URL".to_owned(),
            format!("{raw} cannot be used as a base URL"),
        ));
    }

    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable parsed as `u64`, with a default.
fn get_parsed_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string())),
    }
}
