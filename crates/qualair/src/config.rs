//! Configuration management for qualair.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::report::{DateWindow, TIMESTAMP_FORMAT};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "qualair";

/// Default database path, relative to the working directory.
const DEFAULT_DATABASE_PATH: &str = "data/QUALAIR.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `QUALAIR_`, sections separated by `__`)
/// 2. TOML config file at `~/.config/qualair/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Row caps applied to table and filter pages.
    pub limits: LimitsConfig,
    /// Reporting windows for the histogram and statistics pages.
    pub report: ReportConfig,
    /// Chart rendering configuration.
    pub charts: ChartsConfig,
}

/// Database-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the measurement database file.
    pub path: PathBuf,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the dashboard listens on.
    pub bind: String,
}

/// Row caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum rows returned by the table browser.
    pub table_rows: usize,
    /// Maximum rows returned by the zone filter.
    pub filter_rows: usize,
}

/// Reporting windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Year covered by the histogram page.
    pub year: i32,
    /// Month (1-12) covered by the histogram page.
    pub month: u32,
    /// Start of the statistics window, `YYYY/MM/DD HH:MM:SS`.
    pub stats_start: String,
    /// End of the statistics window, `YYYY/MM/DD HH:MM:SS`.
    pub stats_end: String,
}

/// Chart rendering configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// TrueType font used for chart labels.
    /// Defaults to the first well-known system font found.
    pub font_path: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            table_rows: 50_000,
            filter_rows: 10_000,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            year: 2023,
            month: 1,
            stats_start: "2023/01/01 00:00:00".to_string(),
            stats_end: "2023/01/02 00:00:00".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("QUALAIR_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.limits.table_rows == 0 {
            return Err(validation("table_rows must be greater than 0"));
        }
        if self.limits.filter_rows == 0 {
            return Err(validation("filter_rows must be greater than 0"));
        }

        if !(1..=12).contains(&self.report.month) {
            return Err(validation(format!(
                "month must be between 1 and 12, got {}",
                self.report.month
            )));
        }

        self.bind_addr()?;
        self.stats_window()?;

        Ok(())
    }

    /// Get the database path.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone()
    }

    /// Parse the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not a valid socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|_| validation(format!("invalid bind address: {}", self.server.bind)))
    }

    /// Get the fixed window used by the statistics page.
    ///
    /// # Errors
    ///
    /// Returns an error if either bound is malformed or the window is inverted.
    pub fn stats_window(&self) -> Result<DateWindow> {
        let start = parse_timestamp("stats_start", &self.report.stats_start)?;
        let end = parse_timestamp("stats_end", &self.report.stats_end)?;
        DateWindow::new(start, end).map_err(|e| validation(e.to_string()))
    }
}

fn parse_timestamp(field: &str, value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|_| validation(format!("{field} must be YYYY/MM/DD HH:MM:SS, got '{value}'")))
}

fn validation(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}
