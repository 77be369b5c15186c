//! # Engine Configuration
//!
//! Loaded from a TOML file, then overridden by `CALLFLOW_*` environment
//! variables. Every section has defaults so an empty file is a valid
//! development configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("signature policy `enforce` requires carrier.auth_token (or CALLFLOW_AUTH_TOKEN)")]
    MissingAuthToken,
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Dev,
    Prod,
}

impl Mode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Some(Self::Prod),
            "dev" | "development" => Some(Self::Dev),
            _ => None,
        }
    }
}

/// What to do with a webhook whose signature does not verify.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// Reject with 401.
    Enforce,
    /// Log a warning and serve the request anyway.
    LogOnly,
}

impl SignaturePolicy {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Prod => Self::Enforce,
            Mode::Dev => Self::LogOnly,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "enforce" => Some(Self::Enforce),
            "log_only" | "log-only" | "logonly" => Some(Self::LogOnly),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: Mode,
    pub log_format: LogFormat,
    pub server: ServerConfig,
    pub carrier: CarrierConfig,
    pub flows: FlowsConfig,
    pub interactions: InteractionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Externally visible origin the carrier signs against, e.g.
    /// `https://ivr.example.com`. Reconstructed from request headers if absent.
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierConfig {
    pub auth_token: Option<String>,
    pub signature_policy: Option<SignaturePolicy>,
    pub default_transfer_number: Option<String>,
    pub voice: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowsConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionsConfig {
    /// JSON-lines file; interactions go to the tracing sink when absent.
    pub path: Option<PathBuf>,
    pub queue_capacity: usize,
}

impl Default for InteractionsConfig {
    fn default() -> Self {
        Self {
            path: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Load the optional file, apply process environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CALLFLOW_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CALLFLOW_MODE") {
            self.mode = Mode::parse(&raw).ok_or(ConfigError::InvalidValue {
                key: "CALLFLOW_MODE",
                value: raw,
            })?;
        }
        if let Some(raw) = lookup("CALLFLOW_LOG_FORMAT") {
            self.log_format = match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "CALLFLOW_LOG_FORMAT",
                        value: raw,
                    });
                }
            };
        }
        if let Some(raw) = lookup("CALLFLOW_SIGNATURE_POLICY") {
            self.carrier.signature_policy =
                Some(SignaturePolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                    key: "CALLFLOW_SIGNATURE_POLICY",
                    value: raw,
                })?);
        }
        if let Some(bind) = lookup("CALLFLOW_BIND") {
            self.server.bind = bind;
        }
        if let Some(url) = lookup("CALLFLOW_PUBLIC_BASE_URL") {
            self.server.public_base_url = Some(url);
        }
        if let Some(token) = lookup("CALLFLOW_AUTH_TOKEN") {
            self.carrier.auth_token = Some(token);
        }
        if let Some(path) = lookup("CALLFLOW_FLOWS_PATH") {
            self.flows.path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("CALLFLOW_INTERACTIONS_PATH") {
            self.interactions.path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let token_missing = self
            .carrier
            .auth_token
            .as_deref()
            .is_none_or(|token| token.trim().is_empty());
        if self.signature_policy() == SignaturePolicy::Enforce && token_missing {
            return Err(ConfigError::MissingAuthToken);
        }
        if self.interactions.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "interactions.queue_capacity",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Explicit policy if configured, otherwise derived from the mode.
    pub fn signature_policy(&self) -> SignaturePolicy {
        self.carrier
            .signature_policy
            .unwrap_or_else(|| SignaturePolicy::for_mode(self.mode))
    }
}
