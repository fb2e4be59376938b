//! Configuration types for the PostgREST storage backend.

use std::fmt;
use std::time::Duration;

use url::Url;

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default exposed schema.
pub const DEFAULT_SCHEMA: &str = "public";

/// Errors raised while building a [`RestStoreConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid endpoint URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Endpoint URL must use http or https, got '{0}'")]
    UnsupportedScheme(String),

    #[error("API key must not be empty")]
    MissingApiKey,
}

/// Configuration for the PostgREST storage backend.
#[derive(Clone)]
pub struct RestStoreConfig {
    /// Project URL; tables live under `{url}/rest/v1/`.
    pub url: Url,

    /// Key sent as `apikey` and as the bearer token.
    pub api_key: String,

    /// Schema selected through `Accept-Profile`/`Content-Profile`.
    pub schema: String,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl RestStoreConfig {
    /// Creates a new configuration for the given endpoint and key.
    pub fn new(url: &str, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let parsed = Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(parsed.scheme().to_string()));
        }
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            url: parsed,
            api_key,
            schema: DEFAULT_SCHEMA.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        })
    }

    /// Sets the schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// URL of a table endpoint.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.as_str().trim_end_matches('/'), table)
    }
}

impl fmt::Debug for RestStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStoreConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"<redacted>")
            .field("schema", &self.schema)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
