//! Configuration loading and validation.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::snapshot::weeks::is_monday;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Token expected in `x-admin-token` for mutating routes. Unset disables them.
    #[serde(default)]
    pub admin_token: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            admin_token: None,
        }
    }
}

/// Ranking and snapshot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// IANA timezone used for Monday boundaries
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_rolling_window_weeks")]
    pub rolling_window_weeks: u32,

    /// Ignore results from rounds that are not fully decided yet
    #[serde(default = "default_true")]
    pub only_completed_rounds: bool,

    /// Store unchanged weeks as aliases of an earlier snapshot
    #[serde(default = "default_true")]
    pub dedup_snapshots: bool,

    /// Require a rolling snapshot before seeding off it
    #[serde(default)]
    pub strict_seeding_baseline: bool,

    /// Cutover from which strict seeding applies
    #[serde(default)]
    pub first_official_monday: Option<NaiveDate>,

    /// Categories whose first winner is pinned in RtF, in pin order
    #[serde(default)]
    pub auto_top_categories: Vec<String>,

    /// Number of most recent snapshots per type that keep their payload
    #[serde(default = "default_retention_full_weeks")]
    pub retention_full_weeks: u32,
}

fn default_timezone() -> String {
    "Europe/Berlin".to_string()
}

fn default_rolling_window_weeks() -> u32 {
    61
}

fn default_true() -> bool {
    true
}

fn default_retention_full_weeks() -> u32 {
    26
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            rolling_window_weeks: default_rolling_window_weeks(),
            only_completed_rounds: true,
            dedup_snapshots: true,
            strict_seeding_baseline: false,
            first_official_monday: None,
            auto_top_categories: Vec::new(),
            retention_full_weeks: default_retention_full_weeks(),
        }
    }
}

impl RankingConfig {
    /// Parsed timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone.parse::<Tz>().map_err(|_| {
            ConfigError::ValidationError(format!("Unknown timezone: {}", self.timezone))
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;

        if self.rolling_window_weeks == 0 {
            return Err(ConfigError::ValidationError(
                "Rolling window must be at least one week".to_string(),
            ));
        }

        if self.retention_full_weeks == 0 {
            return Err(ConfigError::ValidationError(
                "Retention must keep at least one week".to_string(),
            ));
        }

        if let Some(monday) = self.first_official_monday {
            if !is_monday(monday) {
                return Err(ConfigError::ValidationError(format!(
                    "first_official_monday {} is not a Monday",
                    monday
                )));
            }
        }

        Ok(())
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ranking: RankingConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        self.ranking.validate()
    }
}
