// partition-refresh-config - Configuration for the partition refresh function
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from PARTITION_REFRESH_CONFIG env var
// 3. Config file contents from PARTITION_REFRESH_CONFIG_CONTENT env var
// 4. Default config file locations (./config.toml, ./.partition-refresh.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use sources::{load_from_file_path, load_from_str};

/// Database name used when none is configured: `{prefix}_streamalert`
pub const DEFAULT_DATABASE_SUFFIX: &str = "_streamalert";

/// Prefix for Athena query results inside the results bucket
pub const ATHENA_S3_PREFIX: &str = "athena_partition_refresh";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default)]
    pub account: AccountConfig,

    #[serde(default)]
    pub athena: AthenaConfig,

    /// Bucket name -> table name
    #[serde(default)]
    pub buckets: BTreeMap<String, String>,

    /// Table names used verbatim instead of being derived from object paths
    #[serde(default = "default_fixed_tables")]
    pub fixed_tables: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_fixed_tables() -> Vec<String> {
    vec!["alerts".to_string()]
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            account: AccountConfig::default(),
            athena: AthenaConfig::default(),
            buckets: BTreeMap::new(),
            fixed_tables: default_fixed_tables(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Deployment account settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Deployment prefix used to derive default resource names
    #[serde(default)]
    pub prefix: String,
}

/// Athena query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_bucket: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub query_poll_interval_ms: u64,

    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_query_timeout_secs() -> u64 {
    300
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            database_name: None,
            results_bucket: None,
            query_poll_interval_ms: default_poll_interval_ms(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl AthenaConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.query_poll_interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

impl RefreshConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Target database: explicit name, else `{prefix}_streamalert`
    pub fn database_name(&self) -> String {
        self.athena
            .database_name
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.account.prefix, DEFAULT_DATABASE_SUFFIX))
    }

    /// Query results location: explicit bucket, else
    /// `s3://{prefix}.streamalert.athena-results`
    pub fn results_bucket(&self) -> String {
        self.athena
            .results_bucket
            .clone()
            .unwrap_or_else(|| format!("s3://{}.streamalert.athena-results", self.account.prefix))
    }
}
