// SQS event handling
//
// Adapts the Lambda SQS event into queue records and runs one batch.
// A returned error fails the invocation so SQS redelivers the batch.

use aws_lambda_events::sqs::SqsEvent;
use partition_refresh::{BatchRunner, BucketTableMap, QueryEngine, QueueRecord, RefreshError};
use tracing::{error, info};

/// Convert SQS messages, keeping the attributes used for diagnostics
pub(crate) fn queue_records(event: SqsEvent) -> Vec<QueueRecord> {
    event
        .records
        .into_iter()
        .map(|message| QueueRecord {
            sent_timestamp: message.attributes.get("SentTimestamp").cloned(),
            message_id: message.message_id,
            body: message.body,
        })
        .collect()
}

pub(crate) async fn handle_sqs_event<Q: QueryEngine + ?Sized>(
    event: SqsEvent,
    buckets: &BucketTableMap,
    engine: &Q,
) -> Result<(), RefreshError> {
    let records = queue_records(event);
    let runner = BatchRunner::new(buckets, engine);

    match runner.run(&records).await {
        Ok(report) => {
            info!(
                queue_records = report.queue_records,
                objects = report.objects,
                unmapped = report.unmapped,
                unmatched = report.unmatched,
                test_events = report.skipped.test_events,
                non_s3_records = report.skipped.non_s3_records,
                malformed = report.skipped.malformed,
                tables = report.applied.tables.len(),
                partitions = report.applied.partitions_added(),
                "Partition refresh complete"
            );
            Ok(())
        }
        Err(err) => {
            error!(kind = err.kind().as_str(), error = %err, "Partition refresh failed");
            Err(err)
        }
    }
}
