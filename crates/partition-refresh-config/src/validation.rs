// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

/// Longest a Lambda invocation may run
pub const MAX_QUERY_TIMEOUT_SECS: u64 = 900;

pub fn validate_config(config: &RefreshConfig) -> Result<()> {
    validate_account_config(config)?;
    validate_athena_config(&config.athena)?;
    validate_buckets(config)?;
    Ok(())
}

fn validate_account_config(config: &RefreshConfig) -> Result<()> {
    let derives_names =
        config.athena.database_name.is_none() || config.athena.results_bucket.is_none();
    if derives_names && config.account.prefix.is_empty() {
        bail!("account.prefix is required unless athena.database_name and athena.results_bucket are both set");
    }
    Ok(())
}

fn validate_athena_config(config: &AthenaConfig) -> Result<()> {
    if let Some(ref database) = config.database_name {
        if database.is_empty() {
            bail!("athena.database_name must not be empty");
        }
    }

    if let Some(ref results_bucket) = config.results_bucket {
        if !results_bucket.starts_with("s3://") || results_bucket.len() <= "s3://".len() {
            bail!(
                "athena.results_bucket must be an s3:// URI, got '{}'",
                results_bucket
            );
        }
    }

    if config.query_poll_interval_ms == 0 {
        bail!("athena.query_poll_interval_ms must be greater than 0");
    }

    if config.query_timeout_secs == 0 {
        bail!("athena.query_timeout_secs must be greater than 0");
    }

    if config.query_timeout_secs > MAX_QUERY_TIMEOUT_SECS {
        bail!(
            "athena.query_timeout_secs must be at most {} (the Lambda execution limit), got {}",
            MAX_QUERY_TIMEOUT_SECS,
            config.query_timeout_secs
        );
    }

    if config.query_poll_interval_ms > config.query_timeout_secs.saturating_mul(1_000) {
        warn!(
            query_poll_interval_ms = config.query_poll_interval_ms,
            query_timeout_secs = config.query_timeout_secs,
            "athena.query_poll_interval_ms exceeds the query timeout; queries are checked once"
        );
    }

    Ok(())
}

fn validate_buckets(config: &RefreshConfig) -> Result<()> {
    if config.buckets.is_empty() {
        warn!("No buckets configured; every notification will be skipped");
    }

    for (bucket, table) in &config.buckets {
        if bucket.is_empty() {
            bail!("buckets: bucket names must not be empty");
        }
        if table.is_empty() {
            bail!("buckets.\"{}\": table name must not be empty", bucket);
        }
    }

    if config.fixed_tables.iter().any(String::is_empty) {
        bail!("fixed_tables must not contain empty names");
    }

    Ok(())
}
