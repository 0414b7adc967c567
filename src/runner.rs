//! Batch orchestration
//!
//! One invocation: check the database, unpack every queue message, accumulate
//! partitions and apply them. Any fatal condition fails the whole batch so the
//! queue redelivers it; there is no partial acknowledgement.

use crate::accumulator::PartitionAccumulator;
use crate::applier::{ApplyReport, PartitionApplier};
use crate::error::{RefreshError, Result};
use crate::notification::{unpack_record, QueueRecord, UnpackStats};
use crate::query_engine::QueryEngine;
use crate::table_map::BucketTableMap;
use tracing::{error, info};

/// Summary of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub queue_records: usize,
    pub objects: usize,
    pub unmapped: usize,
    pub unmatched: usize,
    pub skipped: UnpackStats,
    pub applied: ApplyReport,
}

pub struct BatchRunner<'a, Q: QueryEngine + ?Sized> {
    buckets: &'a BucketTableMap,
    engine: &'a Q,
}

impl<'a, Q: QueryEngine + ?Sized> BatchRunner<'a, Q> {
    pub fn new(buckets: &'a BucketTableMap, engine: &'a Q) -> Self {
        Self { buckets, engine }
    }

    /// Process one batch of queue messages
    pub async fn run(&self, records: &[QueueRecord]) -> Result<RunReport> {
        if !self.engine.database_exists().await {
            error!(database = %self.engine.database(), "Target database does not exist");
            return Err(RefreshError::database_not_found(self.engine.database()));
        }

        let mut accumulator = PartitionAccumulator::new(self.buckets);
        let mut skipped = UnpackStats::default();
        for record in records {
            let (notifications, stats) = unpack_record(record);
            skipped.merge(stats);
            for notification in notifications {
                accumulator.add(&notification.bucket, &notification.key);
            }
        }

        info!(
            queue_records = records.len(),
            objects = accumulator.received_count(),
            tables = accumulator.partitions().table_count(),
            partitions = accumulator.partitions().partition_count(),
            "Processing new Hive partitions"
        );

        let applier = PartitionApplier::new(self.engine);
        let applied = match applier.apply(accumulator.partitions()).await {
            Ok(applied) => applied,
            Err(err) => {
                return Err(RefreshError::apply(accumulator.received_summary(), err));
            }
        };

        Ok(RunReport {
            queue_records: records.len(),
            objects: accumulator.received_count(),
            unmapped: accumulator.unmapped(),
            unmatched: accumulator.unmatched(),
            skipped,
            applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApplyError, ErrorKind};
    use crate::table_map::TableIdentity;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        exists: bool,
        submitted: AtomicUsize,
    }

    #[async_trait]
    impl QueryEngine for CountingEngine {
        fn database(&self) -> &str {
            "test_db"
        }

        async fn database_exists(&self) -> bool {
            self.exists
        }

        async fn submit(&self, _query: &str) -> bool {
            self.submitted.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn engine(exists: bool) -> CountingEngine {
        CountingEngine {
            exists,
            submitted: AtomicUsize::new(0),
        }
    }

    fn buckets() -> BucketTableMap {
        BucketTableMap::default().with_entry("logs-bucket", TableIdentity::FromPath)
    }

    fn s3_record(bucket: &str, key: &str) -> QueueRecord {
        QueueRecord::new(
            json!({
                "Records": [{"s3": {"bucket": {"name": bucket}, "object": {"key": key}}}]
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn test_reports_counts() {
        let engine = engine(true);
        let buckets = buckets();
        let records = vec![
            s3_record("logs-bucket", "dns_logs/2018/08/01/01/a.json"),
            s3_record("logs-bucket", "dns_logs/2018/08/01/01/b.json"),
            s3_record("logs-bucket", "dns_logs/unknown/c.json"),
            s3_record("other-bucket", "dns_logs/2018/08/01/01/d.json"),
            QueueRecord::new(json!({"Event": "s3:TestEvent"}).to_string()),
        ];

        let report = BatchRunner::new(&buckets, &engine).run(&records).await.unwrap();
        assert_eq!(report.queue_records, 5);
        assert_eq!(report.objects, 4);
        assert_eq!(report.unmapped, 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.skipped.test_events, 1);
        assert_eq!(report.applied.partitions_added(), 1);
        assert_eq!(engine.submitted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_database_is_precondition_failure() {
        let engine = engine(false);
        let buckets = buckets();
        let records = vec![s3_record("logs-bucket", "dns_logs/2018/08/01/01/a.json")];

        let err = BatchRunner::new(&buckets, &engine).run(&records).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(engine.submitted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_only_unmapped_inputs_fail_with_summary() {
        let engine = engine(true);
        let buckets = buckets();
        let records = vec![s3_record("other-bucket", "dns_logs/2018/08/01/01/a.json")];

        let err = BatchRunner::new(&buckets, &engine).run(&records).await.unwrap_err();
        match err {
            RefreshError::Apply { summary, source } => {
                assert!(summary.contains("other-bucket"));
                assert!(matches!(source, ApplyError::NoPartitions));
            }
            other => panic!("expected apply failure, got {:?}", other),
        }
        assert_eq!(engine.submitted.load(Ordering::SeqCst), 0);
    }
}
