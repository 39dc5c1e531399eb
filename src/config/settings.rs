//! Configuration settings for the Tributary service.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::system::JoinFailurePolicy;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub oracle: OracleConfig,
    pub store: StoreConfig,
    pub retrievers: Vec<RetrieverConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("tributary.toml"),
            dirs::config_dir()
                .map(|p| p.join("tributary/config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".tributary/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.oracle.base_url.is_empty() {
            return Err(ConfigError::MissingField("oracle.base_url".to_string()).into());
        }
        if self.oracle.model.is_empty() {
            return Err(ConfigError::MissingField("oracle.model".to_string()).into());
        }
        if self.store.retention_secs == 0 {
            return Err(ConfigError::Invalid("store.retention_secs must be > 0".to_string()).into());
        }
        if self.store.max_entries == 0 {
            return Err(ConfigError::Invalid("store.max_entries must be > 0".to_string()).into());
        }

        for retriever in &self.retrievers {
            if retriever.name.is_empty() {
                return Err(ConfigError::MissingField("retrievers.name".to_string()).into());
            }
            match retriever.kind {
                RetrieverKind::Table if retriever.path.is_none() => {
                    return Err(ConfigError::MissingField(format!(
                        "retrievers.{}.path",
                        retriever.name
                    ))
                    .into());
                }
                RetrieverKind::HttpFrame | RetrieverKind::HttpText if retriever.url.is_none() => {
                    return Err(ConfigError::MissingField(format!(
                        "retrievers.{}.url",
                        retriever.name
                    ))
                    .into());
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for the HTTP API.
    pub http_port: u16,
    /// Time budget for each retriever fetch, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8000,
            request_timeout_secs: 30,
        }
    }
}

/// Reasoning oracle configuration (OpenAI-compatible chat API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Base URL of the chat completions API.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// API key (loaded from environment if not set).
    pub api_key: Option<String>,
    /// Oracle call timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum reply tokens.
    pub max_tokens: u32,
    /// Sampling temperature. Routing wants determinism, so zero.
    pub temperature: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            timeout_secs: 30,
            max_tokens: 5000,
            temperature: 0.0,
        }
    }
}

/// Annotation store policy.
///
/// `max_entries` is the size threshold at which the request layer
/// triggers a prune, and `retention_secs` is the age bound the prune
/// enforces. Both are policy knobs of the caller, not of the store
/// itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prune when the store grows past this many annotations.
    pub max_entries: usize,
    /// Age bound applied by the prune, in seconds.
    pub retention_secs: u64,
    /// What to do when one leg of a two-source join fails.
    pub join_failure_policy: JoinFailurePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 10,
            retention_secs: 300,
            join_failure_policy: JoinFailurePolicy::default(),
        }
    }
}

/// Retriever registration data. Registration order in the config file
/// is routing priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Human-readable name of the backing source.
    pub name: String,
    /// Which implementation serves this source.
    pub kind: RetrieverKind,
    /// Records file, for `table` retrievers.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Endpoint URL, for `http_frame` and `http_text` retrievers.
    #[serde(default)]
    pub url: Option<String>,
    /// Whether this source's tables can join another compatible source.
    #[serde(default)]
    pub join_compatible: bool,
}

/// Retriever implementation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrieverKind {
    Table,
    HttpFrame,
    HttpText,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.max_entries, 10);
        assert_eq!(config.store.retention_secs, 300);
        assert_eq!(config.server.http_port, 8000);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [server]
            http_port = 9100
            request_timeout_secs = 10

            [oracle]
            model = "gpt-4o-mini"
            timeout_secs = 15

            [store]
            max_entries = 25
            retention_secs = 600
            join_failure_policy = "error"

            [[retrievers]]
            name = "WEN-OKN Database"
            kind = "http_frame"
            url = "http://localhost:9001/records"
            join_compatible = true

            [[retrievers]]
            name = "NDPES"
            kind = "http_text"
            url = "http://localhost:9002/answer"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.server.http_port, 9100);
        assert_eq!(config.oracle.model, "gpt-4o-mini");
        assert_eq!(config.store.join_failure_policy, JoinFailurePolicy::Error);
        assert_eq!(config.retrievers.len(), 2);
        assert!(config.retrievers[0].join_compatible);
        assert_eq!(config.retrievers[1].kind, RetrieverKind::HttpText);
    }

    #[test]
    fn test_rejects_zero_retention() {
        let toml = r#"
            [store]
            retention_secs = 0
        "#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_rejects_table_retriever_without_path() {
        let toml = r#"
            [[retrievers]]
            name = "Energy Atlas"
            kind = "table"
        "#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_rejects_http_retriever_without_url() {
        let toml = r#"
            [[retrievers]]
            name = "Data Commons"
            kind = "http_frame"
        "#;
        assert!(Config::from_toml(toml).is_err());
    }
}
