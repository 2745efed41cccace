//! # Engine Configuration
//!
//! Configuration for the invoice engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DATABASE_PATH=/var/lib/tally/tally.db                        │
//! │     TALLY_INVOICE_PREFIX=BILL                                          │
//! │                                                                         │
//! │  2. TOML Config File (./tally.toml unless a path is given)             │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tally.toml
//! [database]
//! path = "tally.db"
//! max_connections = 5
//!
//! [invoicing]
//! prefix = "INV"
//! suffix_len = 8
//! max_number_attempts = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use tally_core::numbering::InvoiceNumberGenerator;
use tally_db::DbConfig;

const DEFAULT_CONFIG_FILE: &str = "tally.toml";

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Maximum pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("tally.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Invoicing Settings
// =============================================================================

/// `[invoicing]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicingSettings {
    /// First segment of every invoice number.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Random suffix length on the first attempt.
    #[serde(default = "default_suffix_len")]
    pub suffix_len: usize,

    /// Candidates tried before giving up with DuplicateInvoiceNumber.
    #[serde(default = "default_max_number_attempts")]
    pub max_number_attempts: u32,
}

fn default_prefix() -> String {
    InvoiceNumberGenerator::DEFAULT_PREFIX.to_string()
}

fn default_suffix_len() -> usize {
    InvoiceNumberGenerator::DEFAULT_SUFFIX_LEN
}

fn default_max_number_attempts() -> u32 {
    InvoiceNumberGenerator::DEFAULT_MAX_ATTEMPTS
}

impl Default for InvoicingSettings {
    fn default() -> Self {
        InvoicingSettings {
            prefix: default_prefix(),
            suffix_len: default_suffix_len(),
            max_number_attempts: default_max_number_attempts(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub invoicing: InvoicingSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, or `./tally.toml` if present)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let explicit = config_path.is_some();
        let path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            info!(?path, "Loading engine config from file");
            let contents = std::fs::read_to_string(&path)?;
            Self::from_toml_str(&contents)?
        } else if explicit {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )));
        } else {
            debug!(?path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document. Missing tables and keys take defaults.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    ///
    /// `load` passes the process environment; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TALLY_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("TALLY_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("TALLY_MAX_CONNECTIONS", &max)?;
        }

        if let Some(prefix) = lookup("TALLY_INVOICE_PREFIX") {
            debug!(prefix = %prefix, "Overriding invoice prefix from environment");
            self.invoicing.prefix = prefix;
        }

        if let Some(len) = lookup("TALLY_SUFFIX_LEN") {
            self.invoicing.suffix_len = parse_var("TALLY_SUFFIX_LEN", &len)?;
        }

        if let Some(attempts) = lookup("TALLY_MAX_NUMBER_ATTEMPTS") {
            self.invoicing.max_number_attempts = parse_var("TALLY_MAX_NUMBER_ATTEMPTS", &attempts)?;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let prefix = &self.invoicing.prefix;
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Invalid(format!(
                "invoice prefix must be non-empty ASCII alphanumerics, got '{prefix}'"
            )));
        }

        if !(4..=32).contains(&self.invoicing.suffix_len) {
            return Err(ConfigError::Invalid(
                "suffix_len must be between 4 and 32".into(),
            ));
        }

        if self.invoicing.max_number_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_number_attempts must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Database pool configuration.
    pub fn db_config(&self) -> DbConfig {
        let path = self.database.path.clone();
        let config = DbConfig::new(path);
        if config.is_in_memory() {
            DbConfig::in_memory()
        } else {
            config.max_connections(self.database.max_connections)
        }
    }

    /// Invoice number generator.
    pub fn number_generator(&self) -> InvoiceNumberGenerator {
        InvoiceNumberGenerator::new(
            self.invoicing.prefix.clone(),
            self.invoicing.suffix_len,
            self.invoicing.max_number_attempts,
        )
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}
