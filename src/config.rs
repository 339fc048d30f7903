//! Configuration file parser for ~/.config/ghtopics/config.toml.
//!
//! The file is optional and every key has a default. Unknown keys are
//! accepted but logged, since they are usually typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::storage::SelectionMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

/// Application configuration. Any subset of keys may be given.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API root; `None` means the public GitHub API.
    pub api_base_url: Option<String>,

    /// Personal access token. `GITHUB_TOKEN` takes precedence.
    pub github_token: Option<String>,

    /// Topics saved on first run, when no settings exist yet.
    pub initial_topics: Vec<String>,

    /// Whether one or several topics drive the feed.
    pub selection: SelectionMode,

    /// Rows from the end of the list at which the next page is requested.
    pub load_more_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            github_token: None,
            initial_topics: vec!["rust".to_string()],
            selection: SelectionMode::Multi,
            load_more_buffer: 2,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("initial_topics", &self.initial_topics)
            .field("selection", &self.selection)
            .field("load_more_buffer", &self.load_more_buffer)
            .finish()
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "api_base_url",
        "github_token",
        "initial_topics",
        "selection",
        "load_more_buffer",
    ];

    /// Load configuration from a TOML file.
    ///
    /// A missing or empty file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            path = %path.display(),
            selection = ?config.selection,
            custom_api = config.api_base_url.is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Token to authenticate with, preferring `GITHUB_TOKEN` over the file.
    pub fn github_token(&self) -> Option<SecretString> {
        self.token_with_env(std::env::var("GITHUB_TOKEN").ok())
    }

    fn token_with_env(&self, env: Option<String>) -> Option<SecretString> {
        env.filter(|t| !t.trim().is_empty())
            .or_else(|| self.github_token.clone())
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
    }
}
