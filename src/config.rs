//! Configuration
//!
//! Provides configuration management with:
//! - TOML config file (required; the run aborts without one)
//! - Environment variable overrides
//! - Runtime defaults for everything but the account credentials
//! - Validation before any network activity

use crate::error::ConfigError;
use crate::metrics::SubHourPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_API_BASE_URL: &str = "https://api.steampowered.com";
pub const DEFAULT_STORE_BASE_URL: &str = "https://store.steampowered.com";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Account and Web API settings
    pub steam: SteamConfig,

    /// Where the license ledger comes from
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Remote lookup behaviour
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Report computation options
    #[serde(default)]
    pub report: ReportConfig,

    /// Paths configuration
    #[serde(default)]
    pub paths: PathsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteamConfig {
    pub api_key: String,
    pub steam_id: String,
    pub login: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_store_base_url")]
    pub store_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub steamcmd_path: PathBuf,
    /// Read a saved ledger instead of running the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub lookup_timeout_secs: u64,
    /// Unset means every achievement lookup is issued at once; store price
    /// lookups then fall back to [`crate::prices::DEFAULT_STORE_IN_FLIGHT`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_lookups: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub sub_hour_policy: SubHourPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub prices_file: PathBuf,
    pub log_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

fn default_country_code() -> String {
    "us".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_store_base_url() -> String {
    DEFAULT_STORE_BASE_URL.to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            steamcmd_path: PathBuf::from("steamcmd"),
            file: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: 15,
            max_concurrent_lookups: None,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prices_file: PathBuf::from("prices.json"),
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Config {
    /// Candidate config files, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("game-ledger.toml"),
            PathBuf::from(".game-ledger.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("game-ledger").join("config.toml"));
        }
        paths
    }

    /// Load configuration from file, then environment, then validate.
    ///
    /// An explicit path must exist; otherwise the first existing default
    /// path is used.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => return Err(ConfigError::NotFound(path.to_path_buf())),
            None => {
                let candidates = Self::default_paths();
                candidates
                    .iter()
                    .find(|p| p.exists())
                    .cloned()
                    .ok_or_else(|| ConfigError::NoneFound {
                        tried: candidates
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })?
            }
        };

        info!(config_file = %path.display(), "Loading configuration from file");
        let mut config = Self::load_from_file(&path)?;

        // Override with environment variables
        config.apply_env_overrides()?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Account overrides
        if let Ok(val) = env::var("STEAM_API_KEY") {
            self.steam.api_key = val;
        }
        if let Ok(val) = env::var("STEAM_ID") {
            self.steam.steam_id = val;
        }
        if let Ok(val) = env::var("STEAM_LOGIN") {
            self.steam.login = val;
        }

        if let Ok(val) = env::var("GAME_LEDGER_LEDGER_FILE") {
            self.ledger.file = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("GAME_LEDGER_LOOKUP_TIMEOUT_SECS") {
            self.fetch.lookup_timeout_secs =
                val.parse().map_err(|_| ConfigError::Invalid {
                    key: "GAME_LEDGER_LOOKUP_TIMEOUT_SECS",
                    reason: format!("{:?} is not a number of seconds", val),
                })?;
        }

        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steam.api_key.trim().is_empty() {
            return Err(invalid("steam.api_key", "must not be empty"));
        }

        let id = &self.steam.steam_id;
        if id.len() != 17 || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(
                "steam.steam_id",
                format!("expected a 17-digit account id, got {:?}", id),
            ));
        }

        if self.steam.login.trim().is_empty() && self.ledger.file.is_none() {
            return Err(invalid(
                "steam.login",
                "must not be empty unless ledger.file is set",
            ));
        }

        let cc = &self.steam.country_code;
        if cc.len() != 2 || !cc.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid(
                "steam.country_code",
                format!("expected a two-letter country code, got {:?}", cc),
            ));
        }

        if self.fetch.lookup_timeout_secs == 0 {
            return Err(invalid("fetch.lookup_timeout_secs", "must be greater than 0"));
        }

        if self.fetch.max_concurrent_lookups == Some(0) {
            return Err(invalid(
                "fetch.max_concurrent_lookups",
                "must be greater than 0 when set",
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(invalid(
                "logging.format",
                format!("expected \"pretty\" or \"json\", got {:?}", self.logging.format),
            ));
        }

        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            return Err(invalid(
                "logging.output",
                format!(
                    "expected \"console\", \"file\" or \"both\", got {:?}",
                    self.logging.output
                ),
            ));
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}
