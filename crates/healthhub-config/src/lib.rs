//! Configuration for the HealthHub bed service.
//!
//! Values come from an optional TOML file (`healthhub.toml` by default) and
//! environment overrides such as `HEALTHHUB__STORE__BACKEND=rest`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "healthhub.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "HEALTHHUB";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("config build error: {0}")]
    Build(#[source] config::ConfigError),

    #[error("config deserialize error: {0}")]
    Deserialize(#[source] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.store.backend == StoreBackend::Rest {
            let rest = &self.store.rest;
            let url = rest
                .url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .ok_or("store.rest.url is required for the rest backend")?;
            let parsed =
                url::Url::parse(url).map_err(|e| format!("store.rest.url is invalid: {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err("store.rest.url must use http or https".into());
            }
            if rest.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                return Err("store.rest.api_key is required for the rest backend".into());
            }
            if rest.schema.trim().is_empty() {
                return Err("store.rest.schema must not be empty".into());
            }
        }
        if self.store.rest.timeout_ms == 0 {
            return Err("store.rest.timeout_ms must be > 0".into());
        }
        if self.tables.beds.trim().is_empty() || self.tables.bed_allocations.trim().is_empty() {
            return Err("table names must not be empty".into());
        }
        if self.tables.beds == self.tables.bed_allocations {
            return Err("tables.beds and tables.bed_allocations must differ".into());
        }
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub rest: RestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    /// Project URL; tables are served under `/rest/v1/`.
    #[serde(default)]
    pub url: Option<String>,
    /// For security, prefer HEALTHHUB__STORE__REST__API_KEY over the file.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_schema() -> String {
    "public".into()
}
fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            schema: default_schema(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_beds_table")]
    pub beds: String,
    #[serde(default = "default_allocations_table")]
    pub bed_allocations: String,
}

fn default_beds_table() -> String {
    "beds".into()
}
fn default_allocations_table() -> String {
    "bed_allocations".into()
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            beds: default_beds_table(),
            bed_allocations: default_allocations_table(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigLoadError, DEFAULT_CONFIG_FILE, ENV_PREFIX};
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    /// Loads the configuration from `path` (or the default file when present)
    /// and the environment, then validates it.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigLoadError> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                builder = builder.add_source(File::from(PathBuf::from(p)).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., HEALTHHUB__STORE__REST__TIMEOUT_MS=5000
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder.build().map_err(ConfigLoadError::Build)?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(ConfigLoadError::Deserialize)?;
        merged.validate().map_err(ConfigLoadError::Invalid)?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, ConfigLoadError> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
