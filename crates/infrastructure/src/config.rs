//! Service configuration: structs, YAML parsing, and validation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Index used when the config leaves it unset or empty.
pub const DEFAULT_INDEX: &str = "jumpserver";
/// Document type used when the config leaves it unset or empty.
pub const DEFAULT_DOC_TYPE: &str = "command_store";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

/// Connection settings for the search backend holding the command index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchBackendConfig {
    /// Backend addresses. The adapter talks to the first host; client-side
    /// load balancing is not this layer's concern.
    pub hosts: Vec<String>,

    /// Extra client options (e.g. `timeout_secs`). Unknown keys are
    /// accepted and ignored.
    #[serde(default)]
    pub other: BTreeMap<String, Value>,

    #[serde(default = "default_index")]
    pub index: String,

    #[serde(default = "default_doc_type")]
    pub doc_type: String,
}

fn default_index() -> String {
    DEFAULT_INDEX.to_string()
}

fn default_doc_type() -> String {
    DEFAULT_DOC_TYPE.to_string()
}

impl SearchBackendConfig {
    /// Configured index, falling back to the default when empty.
    pub fn effective_index(&self) -> &str {
        if self.index.is_empty() {
            DEFAULT_INDEX
        } else {
            &self.index
        }
    }

    /// Configured doc type, falling back to the default when empty.
    pub fn effective_doc_type(&self) -> &str {
        if self.doc_type.is_empty() {
            DEFAULT_DOC_TYPE
        } else {
            &self.doc_type
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.is_empty() {
            return Err(ConfigError::Validation {
                field: "hosts".to_string(),
                message: "at least one search backend host is required".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub command_storage: SearchBackendConfig,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub log_format: LogFormat,
}

/// Load and validate the service configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml_ng::from_str(&raw)?;
    config.command_storage.validate()?;
    Ok(config)
}
