use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// History query passed verbatim to the engine.
pub type Condition = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Run configuration, loaded once at startup and passed to every stage.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurgeConfig {
    pub host: String,
    pub port: u16,
    pub base_uri: String,

    pub included_condition: Condition,
    /// Refuse to start when `includedCondition` is `{}`, which matches every
    /// historic instance.
    #[serde(default)]
    pub require_included_condition: bool,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub excluded_condition: Condition,

    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn empty_if_null<'de, D>(de: D) -> Result<Condition, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Condition>::deserialize(de)?.unwrap_or_default())
}

impl PurgeConfig {
    /// Read, normalise and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: PurgeConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.finish()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: PurgeConfig = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        cfg.finish()
    }

    fn finish(mut self) -> Result<Self, ConfigError> {
        self.normalize();
        self.validate()?;
        Ok(self)
    }

    /// `baseUri` always starts with `/` and never ends with one (unless empty).
    pub fn normalize(&mut self) {
        self.host = self.host.trim().to_string();
        self.scheme = self.scheme.trim().to_ascii_lowercase();

        let trimmed = self.base_uri.trim().trim_end_matches('/');
        self.base_uri = if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(ConfigError::Invalid(format!(
                "scheme must be http or https, got '{}'",
                self.scheme
            )));
        }
        if self.timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        if self.require_included_condition && self.included_condition.is_empty() {
            return Err(ConfigError::Invalid("includedCondition must not be empty".into()));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::Invalid("password given without username".into()));
        }
        Ok(())
    }

    /// Root URL of the REST API, e.g. `http://localhost:8080/engine-rest`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.base_uri)
    }

    pub fn includes_everything(&self) -> bool {
        self.included_condition.is_empty()
    }

    pub fn has_exclusions(&self) -> bool {
        !self.excluded_condition.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
