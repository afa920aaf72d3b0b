//! Configuration file parser for newswire.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Environment variables (`NEWSWIRE_DATA_DIR`/`DATA_DIR`, `PORT`) layer on
//! top of the file, and CLI flags layer on top of both.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen port for the HTTP server.
    pub port: u16,

    /// Directory holding the canonical JSON document and its backups.
    pub data_dir: PathBuf,

    /// Directory the generated XML artifact is written to and served from.
    pub public_dir: PathBuf,

    /// Externally visible base URL, used for feed-level link defaults.
    /// Defaults to `http://localhost:<port>` when unset.
    pub public_url: Option<String>,

    /// Whether item creation rejects a URL that already exists in the feed.
    pub reject_duplicate_urls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: PathBuf::from("./data"),
            public_dir: PathBuf::from("./public"),
            public_url: None,
            reject_duplicate_urls: true,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as a warning
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

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "port",
                "data_dir",
                "public_dir",
                "public_url",
                "reject_duplicate_urls",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), port = config.port, "Loaded configuration");
        Ok(config)
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides from an arbitrary lookup. `PORT` and
    /// `NEWSWIRE_DATA_DIR` (or the historical `DATA_DIR`) are recognized;
    /// an unparsable `PORT` is ignored with a warning.
    pub fn apply_env_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = var("NEWSWIRE_DATA_DIR").or_else(|| var("DATA_DIR")) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = var("PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => {
                    tracing::warn!(value = %port, "Ignoring unparsable PORT override");
                }
            }
        }
        self
    }

    /// The externally visible base URL, defaulting to localhost.
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

// ============================================================================
// Tests
// ============================================================================
