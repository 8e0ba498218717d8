//! Configuration for the Extractor

use crate::error::ExtractorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Approximate token budget per chunk (4 characters per token)
    pub max_tokens: usize,

    /// Chunks processed concurrently per batch
    pub batch_size: usize,

    /// Attempts per chunk, including the first
    pub max_attempts: u32,

    /// Fixed delay between attempts at one chunk (milliseconds)
    pub retry_backoff_ms: u64,

    /// Pause between batches (milliseconds)
    pub inter_batch_delay_ms: u64,

    /// Sampling temperature sent with every request
    pub temperature: f32,
}

impl ExtractorConfig {
    /// Character budget per chunk
    pub fn char_budget(&self) -> usize {
        self.max_tokens * 4
    }

    /// Get the retry backoff as a Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Get the inter-batch delay as a Duration
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// Same configuration with backoff and batch delay disabled
    pub fn without_delays(mut self) -> Self {
        self.retry_backoff_ms = 0;
        self.inter_batch_delay_ms = 0;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExtractorError> {
        if self.max_tokens == 0 {
            return Err(ExtractorError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ExtractorError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ExtractorError::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ExtractorError::Config(format!(
                "temperature {} out of range [0.0, 2.0]",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| ExtractorError::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ExtractorError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExtractorError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

impl Default for ExtractorConfig {
    /// 800-token chunks, batches of 5, 3 attempts with 1s backoff, 0.5s between batches
    fn default() -> Self {
        Self {
            max_tokens: 800,
            batch_size: 5,
            max_attempts: 3,
            retry_backoff_ms: 1_000,
            inter_batch_delay_ms: 500,
            temperature: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.char_budget(), 3200);
        assert_eq!(config.retry_backoff(), Duration::from_secs(1));
        assert_eq!(config.inter_batch_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_batch_size() {
        let config = ExtractorConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ExtractorError::Config(_))));
    }

    #[test]
    fn test_invalid_attempts() {
        let config = ExtractorConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_temperature() {
        let config = ExtractorConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_without_delays() {
        let config = ExtractorConfig::default().without_delays();
        assert_eq!(config.retry_backoff(), Duration::ZERO);
        assert_eq!(config.inter_batch_delay(), Duration::ZERO);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ExtractorConfig::from_toml("batch_size = 2\n").unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.max_tokens, 800);
    }

    #[test]
    fn test_toml_rejects_invalid_values() {
        assert!(ExtractorConfig::from_toml("max_tokens = 0\n").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
