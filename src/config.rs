//! Configuration loading and management for docsumma.
//!
//! Loads settings from `docsumma.toml` with environment variable overrides for sensitive data.
//! Every field has a default, so running without a config file is fine as long as an API key
//! is available in the environment.

use crate::summary::{SummaryLength, WordRange};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE: &str = "docsumma.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required API key for provider: {0}")]
    MissingApiKey(String),
    #[error("invalid word range for {tier} summaries: {min}-{max}")]
    InvalidTier {
        tier: SummaryLength,
        min: u32,
        max: u32,
    },
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// LLM provider, only "gemini" is supported
    pub provider: String,
    /// Model identifier (e.g., "gemini-2.5-flash")
    pub model: String,
    /// Base URL of the generative language API
    pub endpoint: String,
    /// System instruction for the chat assistant
    pub persona: String,
    /// First assistant turn shown when a chat opens
    pub greeting: String,
    /// Upper bound for a single remote call
    pub timeout_secs: u64,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub gemini_key: Option<String>,
}

/// Limits applied to uploaded documents before anything is sent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub accepted_types: Vec<String>,
}

/// Advisory word ranges for each summary length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub short: WordRange,
    pub medium: WordRange,
    pub long: WordRange,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub tiers: TierConfig,
}

impl Config {
    /// Load configuration from the default location (docsumma.toml in cwd or home).
    ///
    /// Falls back to defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let mut config = match Self::find_config_file() {
            Some(path) => Self::read_file(&path)?,
            None => {
                tracing::debug!("no {} found, using defaults", CONFIG_FILE);
                Config::default()
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text without touching the environment
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override API keys from environment variables
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.api.gemini_key = Some(key);
        } else if let Ok(key) = std::env::var("API_KEY") {
            self.api.gemini_key = Some(key);
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        let home_config = dirs::home_dir()?
            .join(".config")
            .join("docsumma")
            .join(CONFIG_FILE);
        home_config.exists().then_some(home_config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for tier in SummaryLength::ALL {
            let range = self.tiers.range(tier);
            if range.min == 0 || range.min > range.max {
                return Err(ConfigError::InvalidTier {
                    tier,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    /// Get the API key for the configured provider
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        match self.agent.provider.as_str() {
            "gemini" => self
                .api
                .gemini_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingApiKey("gemini".to_string())),
            other => Err(ConfigError::MissingApiKey(other.to_string())),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.agent.timeout_secs.max(1))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            persona: "You are a friendly and helpful assistant.".to_string(),
            greeting: "Hello! How can I help you today?".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            accepted_types: vec![
                "application/pdf".to_string(),
                "image/jpeg".to_string(),
                "image/png".to_string(),
            ],
        }
    }
}

impl TierConfig {
    pub fn range(&self, tier: SummaryLength) -> WordRange {
        match tier {
            SummaryLength::Short => self.short,
            SummaryLength::Medium => self.medium,
            SummaryLength::Long => self.long,
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            short: WordRange::new(50, 80),
            medium: WordRange::new(120, 150),
            long: WordRange::new(200, 250),
        }
    }
}
