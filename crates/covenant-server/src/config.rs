//! Configuration file parsing for the server.
//!
//! Loads settings from a TOML file: bind address, database path, the LLM
//! backend, extraction tuning and issue tracker connection. Secrets can be
//! supplied through the environment, which wins over the file.

use covenant_extractor::ExtractorConfig;
use covenant_tracker::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default OpenAI-compatible endpoint
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1";

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// A value is out of range or unknown
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8000)
    pub bind_port: u16,

    /// SQLite database file, or `:memory:`
    pub database_path: String,

    /// LLM backend
    pub llm: LlmConfig,

    /// Extraction tuning
    pub extractor: ExtractorConfig,

    /// Issue tracker backends
    pub tracker: TrackerConfig,
}

/// LLM backend settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai` or `mock`
    pub provider: String,

    /// Model name
    pub model: String,

    /// Chat completions base URL
    pub endpoint: String,

    /// API key (usually from `OPENAI_API_KEY`)
    pub api_key: Option<String>,

    /// Request timeout (seconds)
    pub timeout_secs: u64,

    /// Reply of the `mock` provider
    pub mock_response: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8000,
            database_path: "obligations.db".to_string(),
            llm: LlmConfig::default(),
            extractor: ExtractorConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: 60,
            mock_response: "null".to_string(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("mock_response", &self.mock_response)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Configuration for tests: mock LLM, in-memory database, no delays
    pub fn default_test_config() -> Self {
        let mut config = Self {
            database_path: ":memory:".to_string(),
            ..Default::default()
        };
        config.llm.provider = "mock".to_string();
        config.extractor = config.extractor.without_delays();
        config.tracker.default_tool = "mock".to_string();
        config
    }

    /// Override secrets from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override secrets through `lookup`; empty values are ignored
    ///
    /// Keys: `OPENAI_API_KEY`, `JIRA_SERVER_URL`, `JIRA_EMAIL`,
    /// `JIRA_API_TOKEN`, `JIRA_PROJECT_KEY`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get("JIRA_SERVER_URL") {
            self.tracker.jira.server_url = Some(url);
        }
        if let Some(email) = get("JIRA_EMAIL") {
            self.tracker.jira.email = Some(email);
        }
        if let Some(token) = get("JIRA_API_TOKEN") {
            self.tracker.jira.api_token = Some(token);
        }
        if let Some(project) = get("JIRA_PROJECT_KEY") {
            self.tracker.jira.project_key = project;
        }
    }

    /// Check the configuration before starting
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.extractor
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        match self.llm.provider.as_str() {
            "openai" => {
                if !self
                    .llm
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.trim().is_empty())
                {
                    return Err(ConfigError::MissingField(
                        "llm.api_key (or OPENAI_API_KEY)".to_string(),
                    ));
                }
            }
            "mock" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown llm provider '{}', expected 'openai' or 'mock'",
                    other
                )));
            }
        }

        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingField("database_path".to_string()));
        }
        Ok(())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.extractor.batch_size, 5);
        assert_eq!(config.tracker.default_tool, "jira");
    }

    #[test]
    fn test_openai_requires_key() {
        let config = ServerConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField(_))
        ));
    }

    #[test]
    fn test_test_config_is_valid() {
        let config = ServerConfig::default_test_config();
        config.validate().unwrap();
        assert_eq!(config.extractor.retry_backoff_ms, 0);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = ServerConfig::default_test_config();
        config.llm.provider = "claude".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
            bind_port = 9000

            [llm]
            provider = "mock"

            [extractor]
            batch_size = 2

            [tracker.jira]
            project_key = "LEGAL"
        "#;
        let config = ServerConfig::from_toml(toml).unwrap();
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.extractor.batch_size, 2);
        assert_eq!(config.extractor.max_tokens, 800);
        assert_eq!(config.tracker.jira.project_key, "LEGAL");
        assert_eq!(config.tracker.default_tool, "jira");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ServerConfig::default();
        config.llm.api_key = Some("from-file".into());

        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "from-env"),
            ("JIRA_API_TOKEN", "jira-token"),
            ("JIRA_EMAIL", ""),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.tracker.jira.api_token.as_deref(), Some("jira-token"));
        assert_eq!(config.tracker.jira.email, None);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = LlmConfig::default();
        config.api_key = Some("sk-secret".into());
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
