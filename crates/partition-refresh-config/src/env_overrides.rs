use super::{LogFormat, RefreshConfig};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeMap;

pub const ENV_PREFIX: &str = "PARTITION_REFRESH_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    /// Get an environment variable with the PARTITION_REFRESH_ prefix applied
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RefreshConfig, env: &E) -> Result<()> {
    // Account
    if let Some(prefix) = get_env_string(env, "PREFIX") {
        config.account.prefix = prefix;
    }

    // Athena
    if let Some(database) = get_env_string(env, "DATABASE_NAME") {
        config.athena.database_name = Some(database);
    }
    if let Some(results_bucket) = get_env_string(env, "RESULTS_BUCKET") {
        config.athena.results_bucket = Some(results_bucket);
    }
    if let Some(val) = get_env_u64(env, "QUERY_POLL_INTERVAL_MS")? {
        config.athena.query_poll_interval_ms = val;
    }
    if let Some(val) = get_env_u64(env, "QUERY_TIMEOUT_SECS")? {
        config.athena.query_timeout_secs = val;
    }

    // Bucket mapping replaces the file mapping entirely
    if let Some(buckets) = get_env_string(env, "BUCKETS") {
        config.buckets = parse_bucket_list(&buckets)
            .with_context(|| format!("Invalid {}BUCKETS value", ENV_PREFIX))?;
    }
    if let Some(tables) = get_env_string(env, "FIXED_TABLES") {
        config.fixed_tables = tables
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.logging.format = format
            .parse::<LogFormat>()
            .with_context(|| format!("Invalid {}LOG_FORMAT value", ENV_PREFIX))?;
    }

    Ok(())
}

/// Parse `bucket=table,bucket=table`
fn parse_bucket_list(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut buckets = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((bucket, table)) = entry.split_once('=') else {
            bail!("expected 'bucket=table', got '{}'", entry);
        };
        let (bucket, table) = (bucket.trim(), table.trim());
        if bucket.is_empty() || table.is_empty() {
            bail!("expected 'bucket=table', got '{}'", entry);
        }
        buckets.insert(bucket.to_string(), table.to_string());
    }
    Ok(buckets)
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
