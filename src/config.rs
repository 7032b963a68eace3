//! Worker configuration.
//!
//! Everything here is read once at startup and never changes while jobs
//! are processed. A bad key is a startup failure, not a per-job one.

use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::auth::{PermissionMatrix, VaultKey};

/// Open Library search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://openlibrary.org/search.json";

/// Upper bound on a single search request, connect included.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No encryption key configured. Set ENCRYPTION_KEY or pass --key.")]
    MissingKey,

    #[error("Encryption key is not valid URL-safe base64: {0}")]
    InvalidKeyEncoding(#[source] base64::DecodeError),

    #[error("Invalid encryption key: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid search URL {url:?}: {reason}")]
    InvalidSearchUrl { url: String, reason: String },

    #[error("Search timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Credential vault key.
    pub key: VaultKey,

    /// Catalog search endpoint.
    pub search_url: String,

    /// Timeout applied to every search request.
    pub search_timeout: Duration,

    /// Role → operation grants.
    pub permissions: PermissionMatrix,
}

impl WorkerConfig {
    /// Create a config with the standard matrix and Open Library search.
    pub fn new(key: VaultKey) -> Self {
        Self {
            key,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            permissions: PermissionMatrix::standard(),
        }
    }

    /// Build from the raw `ENCRYPTION_KEY` value, if any.
    pub fn from_encoded_key(encoded: Option<&str>) -> Result<Self, ConfigError> {
        let encoded = encoded.ok_or(ConfigError::MissingKey)?;
        Ok(Self::new(VaultKey::from_base64(encoded)?))
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionMatrix) -> Self {
        self.permissions = permissions;
        self
    }

    /// Check everything that can be checked before the first job.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_search_url(&self.search_url)?;
        if self.search_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Parse a search endpoint, which must be absolute http(s).
pub fn parse_search_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidSearchUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}
