//! Uploader configuration
//!
//! Loaded from the environment (optionally via a `.env` file), then
//! overridden by command-line flags, then validated.

use graphload_common::{GraphLoadError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::reader::{TabularProfile, DEFAULT_DELIMITER};

// ============================================================================
// Uploader Configuration Constants
// ============================================================================

/// Default Gremlin Server HTTP endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8182/gremlin";

/// Default store request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of entity types uploaded at once.
pub const DEFAULT_MAX_TASKS: usize = 4;

/// Default graph config file.
pub const DEFAULT_GRAPH_CONFIG: &str = "graph.json";

/// Default error log file.
pub const DEFAULT_ERROR_LOG: &str = "graphload-errors.log";

/// Default insert attempts per record (1 = no retry).
pub const DEFAULT_INSERT_ATTEMPTS: u32 = 1;

/// Default pause between insert attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Connection settings for the graph store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub endpoint: String,
    pub auth_key: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            auth_key: None,
            database: None,
            collection: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// How often a failed insert request is re-sent
///
/// Only transport failures are retried. A store that answers with no created
/// element is never asked again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Single attempt per record
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay_ms: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_INSERT_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Complete uploader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderConfig {
    pub store: StoreConfig,
    /// Maximum number of entity types uploaded concurrently
    pub max_tasks: usize,
    pub graph_config_file: PathBuf,
    pub error_log_path: PathBuf,
    /// Field separator of the data files
    pub delimiter: u8,
    /// Text qualifier of the data files; `None` disables quoting
    pub quote: Option<u8>,
    pub retry: RetryPolicy,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            max_tasks: DEFAULT_MAX_TASKS,
            graph_config_file: PathBuf::from(DEFAULT_GRAPH_CONFIG),
            error_log_path: PathBuf::from(DEFAULT_ERROR_LOG),
            delimiter: DEFAULT_DELIMITER,
            quote: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl UploaderConfig {
    /// Load `.env` if present, then read the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `GRAPHLOAD_ENDPOINT`, `GRAPHLOAD_AUTH_KEY`, `GRAPHLOAD_DATABASE`,
    ///   `GRAPHLOAD_COLLECTION`, `GRAPHLOAD_TIMEOUT_SECS`: store session
    /// - `GRAPHLOAD_MAX_TASKS`: entity types uploaded at once
    /// - `GRAPHLOAD_GRAPH_CONFIG`: graph config file
    /// - `GRAPHLOAD_ERROR_LOG`: error log file
    /// - `GRAPHLOAD_FIELD_DELIMITER`: `tab` or a single character
    /// - `GRAPHLOAD_TEXT_QUALIFIER`: `none` or a single character
    /// - `GRAPHLOAD_INSERT_ATTEMPTS`, `GRAPHLOAD_RETRY_DELAY_MS`: opt-in retry
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let delimiter = match lookup("GRAPHLOAD_FIELD_DELIMITER") {
            Some(value) => parse_delimiter(&value)?,
            None => defaults.delimiter,
        };

        let quote = match lookup("GRAPHLOAD_TEXT_QUALIFIER") {
            Some(value) => parse_quote(&value)?,
            None => defaults.quote,
        };

        let config = Self {
            store: StoreConfig {
                endpoint: lookup("GRAPHLOAD_ENDPOINT").unwrap_or(defaults.store.endpoint),
                auth_key: lookup("GRAPHLOAD_AUTH_KEY").filter(|k| !k.is_empty()),
                database: lookup("GRAPHLOAD_DATABASE").filter(|d| !d.is_empty()),
                collection: lookup("GRAPHLOAD_COLLECTION").filter(|c| !c.is_empty()),
                timeout_secs: lookup("GRAPHLOAD_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.store.timeout_secs),
            },
            max_tasks: lookup("GRAPHLOAD_MAX_TASKS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_tasks),
            graph_config_file: lookup("GRAPHLOAD_GRAPH_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.graph_config_file),
            error_log_path: lookup("GRAPHLOAD_ERROR_LOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.error_log_path),
            delimiter,
            quote,
            retry: RetryPolicy {
                max_attempts: lookup("GRAPHLOAD_INSERT_ATTEMPTS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.retry.max_attempts),
                delay_ms: lookup("GRAPHLOAD_RETRY_DELAY_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.retry.delay_ms),
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.endpoint.trim().is_empty() {
            return Err(GraphLoadError::config("store endpoint cannot be empty"));
        }

        if self.store.timeout_secs == 0 {
            return Err(GraphLoadError::config("GRAPHLOAD_TIMEOUT_SECS must be greater than 0"));
        }

        if self.max_tasks == 0 {
            return Err(GraphLoadError::config("GRAPHLOAD_MAX_TASKS must be greater than 0"));
        }

        if self.retry.max_attempts == 0 {
            return Err(GraphLoadError::config(
                "GRAPHLOAD_INSERT_ATTEMPTS must be greater than 0",
            ));
        }

        if matches!(self.delimiter, b'\n' | b'\r') {
            return Err(GraphLoadError::config("field delimiter cannot be a line break"));
        }

        if let Some(quote) = self.quote {
            if matches!(quote, b'\n' | b'\r') {
                return Err(GraphLoadError::config("text qualifier cannot be a line break"));
            }
            if quote == self.delimiter {
                return Err(GraphLoadError::config(
                    "text qualifier must differ from the field delimiter",
                ));
            }
        }

        Ok(())
    }

    /// Record layout of the data files
    pub fn profile(&self) -> TabularProfile {
        TabularProfile {
            delimiter: self.delimiter,
            quote: self.quote,
        }
    }
}

/// Parse a delimiter given as `tab`, `\t`, or a single ASCII character
pub fn parse_delimiter(value: &str) -> Result<u8> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(GraphLoadError::config(format!(
            "field delimiter must be a single ASCII character, got '{}'",
            other
        ))),
    }
}

/// Parse a text qualifier given as `none` (or empty) or a single ASCII character
pub fn parse_quote(value: &str) -> Result<Option<u8>> {
    match value {
        "" | "none" => Ok(None),
        other if other.len() == 1 && other.is_ascii() => Ok(Some(other.as_bytes()[0])),
        other => Err(GraphLoadError::config(format!(
            "text qualifier must be a single ASCII character or 'none', got '{}'",
            other
        ))),
    }
}
