// Athena-backed query engine
//
// Statements run in the configured database with results written under
// {results_bucket}/athena_partition_refresh/YYYY/MM/DD. Each submission is
// polled until it reaches a terminal state or the timeout elapses.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client;
use chrono::{DateTime, Utc};
use partition_refresh::QueryEngine;
use partition_refresh_config::{RefreshConfig, ATHENA_S3_PREFIX};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Glue data catalog backing Athena databases
const DATA_CATALOG: &str = "AwsDataCatalog";

/// Where a polled query currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryProgress {
    Pending,
    Succeeded,
    Failed,
}

pub(crate) fn classify_state(state: Option<&QueryExecutionState>) -> QueryProgress {
    match state {
        Some(QueryExecutionState::Succeeded) => QueryProgress::Succeeded,
        Some(QueryExecutionState::Failed) | Some(QueryExecutionState::Cancelled) => {
            QueryProgress::Failed
        }
        _ => QueryProgress::Pending,
    }
}

/// Results location for queries started at `now`
pub(crate) fn output_location(results_bucket: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}",
        results_bucket.trim_end_matches('/'),
        ATHENA_S3_PREFIX,
        now.format("%Y/%m/%d")
    )
}

pub struct AthenaQueryEngine {
    client: Client,
    database: String,
    results_bucket: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl AthenaQueryEngine {
    pub fn new(client: Client, config: &RefreshConfig) -> Self {
        Self {
            client,
            database: config.database_name(),
            results_bucket: config.results_bucket(),
            poll_interval: config.athena.poll_interval(),
            timeout: config.athena.query_timeout(),
        }
    }

    async fn start_query(&self, query: &str) -> Result<String> {
        let context = QueryExecutionContext::builder()
            .database(&self.database)
            .build();
        let results = ResultConfiguration::builder()
            .output_location(output_location(&self.results_bucket, Utc::now()))
            .build();

        let output = self
            .client
            .start_query_execution()
            .query_string(query)
            .query_execution_context(context)
            .result_configuration(results)
            .send()
            .await
            .map_err(|e| anyhow!("StartQueryExecution failed: {}", DisplayErrorContext(&e)))?;

        output
            .query_execution_id()
            .map(str::to_string)
            .context("StartQueryExecution returned no execution id")
    }

    async fn wait_for_query(&self, execution_id: &str) -> Result<bool> {
        let deadline = Instant::now()
            .checked_add(self.timeout)
            .context("query timeout is out of range")?;
        loop {
            let output = self
                .client
                .get_query_execution()
                .query_execution_id(execution_id)
                .send()
                .await
                .map_err(|e| anyhow!("GetQueryExecution failed: {}", DisplayErrorContext(&e)))?;

            let status = output.query_execution().and_then(|q| q.status());
            match classify_state(status.and_then(|s| s.state())) {
                QueryProgress::Succeeded => return Ok(true),
                QueryProgress::Failed => {
                    error!(
                        execution_id = %execution_id,
                        reason = status.and_then(|s| s.state_change_reason()).unwrap_or("unknown"),
                        "Athena query failed"
                    );
                    return Ok(false);
                }
                QueryProgress::Pending => {}
            }

            if Instant::now() >= deadline {
                warn!(
                    execution_id = %execution_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Athena query did not finish in time"
                );
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl QueryEngine for AthenaQueryEngine {
    fn database(&self) -> &str {
        &self.database
    }

    async fn database_exists(&self) -> bool {
        let result = self
            .client
            .get_database()
            .catalog_name(DATA_CATALOG)
            .database_name(&self.database)
            .send()
            .await;

        match result {
            Ok(_) => true,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_metadata_exception())
                    .unwrap_or(false);
                if !missing {
                    error!(
                        database = %self.database,
                        error = %DisplayErrorContext(&err),
                        "Failed to look up Athena database"
                    );
                }
                false
            }
        }
    }

    async fn submit(&self, query: &str) -> bool {
        debug!(query = %query, "Starting Athena query");
        let execution_id = match self.start_query(query).await {
            Ok(id) => id,
            Err(err) => {
                error!(error = %err, "Failed to start Athena query");
                return false;
            }
        };

        match self.wait_for_query(&execution_id).await {
            Ok(succeeded) => {
                if succeeded {
                    info!(execution_id = %execution_id, "Athena query succeeded");
                }
                succeeded
            }
            Err(err) => {
                error!(execution_id = %execution_id, error = %err, "Failed to poll Athena query");
                false
            }
        }
    }
}
