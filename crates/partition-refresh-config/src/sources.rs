// Configuration source loading
//
// Priority order:
// 1. Environment variables (PARTITION_REFRESH_* prefix)
// 2. Config file path from PARTITION_REFRESH_CONFIG
// 3. Inline config content from PARTITION_REFRESH_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.partition-refresh.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RefreshConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_FILES: &[&str] = &["./config.toml", "./.partition-refresh.toml"];

/// Load configuration using native environment/file access.
pub fn load_config() -> Result<RefreshConfig> {
    let mut config = load_from_file()?.unwrap_or_default();

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file() -> Result<Option<RefreshConfig>> {
    if let Ok(path) = env::var(format!("{}CONFIG", ENV_PREFIX)) {
        return read_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var(format!("{}CONFIG_CONTENT", ENV_PREFIX)) {
        let config: RefreshConfig = toml::from_str(&content)
            .context("Failed to parse inline config from PARTITION_REFRESH_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_CONFIG_FILES {
        let path = Path::new(path);
        if path.exists() {
            return read_file(path).map(Some);
        }
    }

    Ok(None)
}

fn read_file(path: &Path) -> Result<RefreshConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path, then apply environment
/// overrides. Returns an error if the file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RefreshConfig> {
    let mut config = read_file(path.as_ref())?;
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

/// Parse and validate TOML content without consulting the environment.
pub fn load_from_str(content: &str) -> Result<RefreshConfig> {
    let config: RefreshConfig = toml::from_str(content).context("Failed to parse config")?;
    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;
    use std::io::Write;

    const SAMPLE: &str = r#"
fixed_tables = ["alerts"]

[account]
prefix = "acme"

[athena]
results_bucket = "s3://acme-athena-results"
query_timeout_secs = 120

[buckets]
"acme.streamalerts" = "alerts"
"acme.streamalert.data" = "data"

[logging]
level = "debug"
format = "json"
"#;

    #[test]
    fn test_load_from_str() {
        let config = load_from_str(SAMPLE).unwrap();
        assert_eq!(config.account.prefix, "acme");
        assert_eq!(config.database_name(), "acme_streamalert");
        assert_eq!(config.results_bucket(), "s3://acme-athena-results");
        assert_eq!(config.athena.query_timeout_secs, 120);
        assert_eq!(config.athena.query_poll_interval_ms, 1_000);
        assert_eq!(config.buckets.len(), 2);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = load_from_str("[account]\nprefix = \"acme\"\n").unwrap();
        assert!(config.buckets.is_empty());
        assert_eq!(config.fixed_tables, vec!["alerts".to_string()]);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_oversized_query_timeout_is_rejected() {
        let content = "[account]\nprefix = \"acme\"\n\n[athena]\nquery_timeout_secs = 9223372036854775807\n";
        let err = load_from_str(content).unwrap_err();
        assert!(err.to_string().contains("query_timeout_secs"));
    }

    #[test]
    fn test_load_from_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_from_file_path(file.path()).unwrap();
        assert_eq!(
            config.buckets.get("acme.streamalerts").map(String::as_str),
            Some("alerts")
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_from_file_path("/nonexistent/partition-refresh.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
