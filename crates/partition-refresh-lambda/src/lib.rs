// AWS Lambda runtime adapter
//
// Receives SQS batches of S3 bucket notifications and registers the
// matching Hive partitions through Athena.
//
// Philosophy: Use lambda_runtime's provided tokio
// We don't add our own tokio - lambda_runtime provides it

use aws_lambda_events::sqs::SqsEvent;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use partition_refresh::BucketTableMap;
use partition_refresh_config::{LogFormat, LoggingConfig, RefreshConfig};
use std::sync::Arc;
use tracing::info;

mod athena;
mod handlers;

pub use athena::AthenaQueryEngine;

pub(crate) struct LambdaState {
    pub buckets: BucketTableMap,
    pub engine: AthenaQueryEngine,
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    let config = RefreshConfig::load()
        .map_err(|e| Error::from(format!("Failed to load configuration: {:#}", e)))?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_timestamp = env!("BUILD_TIMESTAMP"),
        "Starting partition refresh"
    );

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let engine = AthenaQueryEngine::new(aws_sdk_athena::Client::new(&aws_config), &config);
    let buckets = BucketTableMap::from_config(&config.buckets, &config.fixed_tables);
    info!(
        database = %config.database_name(),
        results_bucket = %config.results_bucket(),
        buckets = config.buckets.len(),
        "Athena partition refresh configured"
    );

    let state = Arc::new(LambdaState { buckets, engine });

    lambda_runtime::run(service_fn(move |event: LambdaEvent<SqsEvent>| {
        let state = state.clone();
        async move {
            let (payload, _context) = event.into_parts();
            handlers::handle_sqs_event(payload, &state.buckets, &state.engine)
                .await
                .map_err(Error::from)
        }
    }))
    .await
}

/// Initialize tracing/logging from the logging config
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // CloudWatch does not render ANSI colors
    let _ = match config.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_ansi(false)),
        ),
    };
}
