// End-to-end tests for partition refresh
//
// Drives BatchRunner with SQS-shaped queue messages against a recording
// query engine and checks the exact statements issued.

use async_trait::async_trait;
use partition_refresh::{
    ApplyError, BatchRunner, BucketTableMap, ErrorKind, QueryEngine, QueueRecord, RefreshError,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Mutex;

struct RecordingEngine {
    database_exists: bool,
    accept: bool,
    existence_checks: Mutex<usize>,
    queries: Mutex<Vec<String>>,
}

impl RecordingEngine {
    fn new(database_exists: bool, accept: bool) -> Self {
        Self {
            database_exists,
            accept,
            existence_checks: Mutex::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryEngine for RecordingEngine {
    fn database(&self) -> &str {
        "acme_streamalert"
    }

    async fn database_exists(&self) -> bool {
        *self.existence_checks.lock().unwrap() += 1;
        self.database_exists
    }

    async fn submit(&self, query: &str) -> bool {
        self.queries.lock().unwrap().push(query.to_string());
        self.accept
    }
}

fn bucket_map() -> BucketTableMap {
    let mut buckets = BTreeMap::new();
    buckets.insert("logs-bucket".to_string(), "dns_logs".to_string());
    buckets.insert("special-bucket".to_string(), "alerts".to_string());
    BucketTableMap::from_config(&buckets, &["alerts"])
}

/// SQS message carrying an S3 notification, with the key encoded as S3 does
fn sqs_message(message_id: &str, bucket: &str, encoded_key: &str) -> QueueRecord {
    QueueRecord {
        message_id: Some(message_id.to_string()),
        sent_timestamp: Some("1533088800000".to_string()),
        body: Some(
            json!({
                "Records": [{
                    "eventVersion": "2.0",
                    "eventSource": "aws:s3",
                    "eventName": "ObjectCreated:Put",
                    "s3": {
                        "s3SchemaVersion": "1.0",
                        "bucket": {"name": bucket, "arn": format!("arn:aws:s3:::{}", bucket)},
                        "object": {"key": encoded_key, "size": 1024}
                    }
                }]
            })
            .to_string(),
        ),
    }
}

#[tokio::test]
async fn test_single_record_adds_partition() {
    let engine = RecordingEngine::new(true, true);
    let buckets = bucket_map();
    let records = vec![sqs_message(
        "msg-1",
        "logs-bucket",
        "dns_logs/2018/08/01/01/part-0001.json",
    )];

    let report = BatchRunner::new(&buckets, &engine)
        .run(&records)
        .await
        .unwrap();

    assert_eq!(
        engine.queries(),
        vec![
            "ALTER TABLE dns_logs ADD IF NOT EXISTS PARTITION (dt = '2018-08-01-01') \
             LOCATION 's3://logs-bucket/dns_logs/2018/08/01/01';"
                .to_string()
        ]
    );
    assert_eq!(report.applied.tables.get("dns_logs"), Some(&1));
}

#[tokio::test]
async fn test_only_test_event_fails_without_query() {
    let engine = RecordingEngine::new(true, true);
    let buckets = bucket_map();
    let records = vec![QueueRecord::new(
        json!({
            "Service": "Amazon S3",
            "Event": "s3:TestEvent",
            "Time": "2018-08-01T01:00:00.000Z",
            "Bucket": "logs-bucket"
        })
        .to_string(),
    )];

    let err = BatchRunner::new(&buckets, &engine)
        .run(&records)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Application);
    assert!(matches!(
        err,
        RefreshError::Apply {
            source: ApplyError::NoPartitions,
            ..
        }
    ));
    assert!(engine.queries().is_empty());
}

#[tokio::test]
async fn test_missing_database_stops_before_processing() {
    let engine = RecordingEngine::new(false, true);
    let buckets = bucket_map();
    let records = vec![
        sqs_message("msg-1", "logs-bucket", "dns_logs/2018/08/01/01/a.json"),
        QueueRecord::new("not even json"),
    ];

    let err = BatchRunner::new(&buckets, &engine)
        .run(&records)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(
        err.to_string(),
        "the 'acme_streamalert' database does not exist"
    );
    assert_eq!(*engine.existence_checks.lock().unwrap(), 1);
    assert!(engine.queries().is_empty());
}

#[tokio::test]
async fn test_fixed_table_keeps_its_name() {
    let engine = RecordingEngine::new(true, true);
    let buckets = bucket_map();
    // '=' arrives percent-encoded in S3 notifications
    let records = vec![sqs_message(
        "msg-1",
        "special-bucket",
        "alerts/dt%3D2018-08-01-01/x.json",
    )];

    BatchRunner::new(&buckets, &engine)
        .run(&records)
        .await
        .unwrap();

    assert_eq!(
        engine.queries(),
        vec![
            "ALTER TABLE alerts ADD IF NOT EXISTS PARTITION (dt = '2018-08-01-01') \
             LOCATION 's3://special-bucket/alerts/dt=2018-08-01-01';"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn test_duplicate_deliveries_collapse() {
    let engine = RecordingEngine::new(true, true);
    let buckets = bucket_map();
    let records = vec![
        sqs_message("msg-1", "logs-bucket", "dns_logs/2018/08/01/01/part-0001.json"),
        sqs_message("msg-2", "logs-bucket", "dns_logs/2018/08/01/01/part-0002.json"),
        sqs_message("msg-3", "logs-bucket", "cloudtrail/2018/08/01/02/part-0001.json"),
        sqs_message("msg-4", "unmapped-bucket", "dns_logs/2018/08/01/03/part-0001.json"),
        sqs_message("msg-5", "logs-bucket", "dns_logs/no-date/part-0001.json"),
    ];

    let report = BatchRunner::new(&buckets, &engine)
        .run(&records)
        .await
        .unwrap();

    let queries = engine.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(
        queries[0],
        "ALTER TABLE cloudtrail ADD IF NOT EXISTS PARTITION (dt = '2018-08-01-02') \
         LOCATION 's3://logs-bucket/cloudtrail/2018/08/01/02';"
    );
    assert_eq!(queries[1].matches("PARTITION").count(), 1);
    assert_eq!(report.unmapped, 1);
    assert_eq!(report.unmatched, 1);
}

#[tokio::test]
async fn test_rejected_query_fails_batch() {
    let engine = RecordingEngine::new(true, false);
    let buckets = bucket_map();
    let records = vec![sqs_message(
        "msg-1",
        "logs-bucket",
        "dns_logs/2018/08/01/01/part-0001.json",
    )];

    let err = BatchRunner::new(&buckets, &engine)
        .run(&records)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Application);
    let message = err.to_string();
    assert!(message.contains("ALTER TABLE dns_logs ADD IF NOT EXISTS"));
    assert!(message.contains("logs-bucket"));
}
