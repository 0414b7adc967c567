//! S3 bucket notification envelopes delivered through SQS
//!
//! Each queue message body is a JSON document that is either an S3 test
//! event (`{"Event": "s3:TestEvent", ...}`) or a batch of event records
//! (`{"Records": [{"s3": {"bucket": {"name": ...}, "object": {"key": ...}}}]}`).

use serde::Deserialize;
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// Event type S3 sends when a notification configuration is created
pub const S3_TEST_EVENT: &str = "s3:TestEvent";

/// One queue message as handed over by the runtime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueRecord {
    pub message_id: Option<String>,
    pub sent_timestamp: Option<String>,
    pub body: Option<String>,
}

impl QueueRecord {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }
}

/// A newly created object, with its key already percent-decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNotification {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Event")]
    event: Option<String>,
    #[serde(rename = "Records")]
    records: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    s3: Option<S3Entity>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: Option<S3Bucket>,
    object: Option<S3Object>,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: Option<String>,
}

/// Counters for queue messages and sub-records that were skipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackStats {
    pub test_events: usize,
    pub non_s3_records: usize,
    pub malformed: usize,
}

impl UnpackStats {
    pub fn merge(&mut self, other: UnpackStats) {
        self.test_events += other.test_events;
        self.non_s3_records += other.non_s3_records;
        self.malformed += other.malformed;
    }
}

/// Extract object notifications from one queue message. Test events,
/// non-S3 records and malformed entries are logged and skipped.
pub fn unpack_record(record: &QueueRecord) -> (Vec<ObjectNotification>, UnpackStats) {
    let mut stats = UnpackStats::default();
    let mut notifications = Vec::new();

    debug!(
        message_id = record.message_id.as_deref().unwrap_or("-"),
        sent_timestamp = record.sent_timestamp.as_deref().unwrap_or("-"),
        "Processing queue message"
    );

    let Some(body) = record.body.as_deref() else {
        warn!(message_id = ?record.message_id, "Skipping queue message without a body");
        stats.malformed += 1;
        return (notifications, stats);
    };

    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(message_id = ?record.message_id, error = %err, "Skipping queue message with invalid JSON body");
            stats.malformed += 1;
            return (notifications, stats);
        }
    };

    if envelope.event.as_deref() == Some(S3_TEST_EVENT) {
        debug!("Skipping S3 bucket notification test event");
        stats.test_events += 1;
        return (notifications, stats);
    }

    let Some(records) = envelope.records else {
        warn!(message_id = ?record.message_id, "Skipping queue message without 'Records'");
        stats.malformed += 1;
        return (notifications, stats);
    };

    for value in records {
        let s3 = match serde_json::from_value::<EventRecord>(value.clone()) {
            Ok(EventRecord { s3: Some(s3) }) => s3,
            Ok(EventRecord { s3: None }) => {
                info!(record = %value, "Skipping non-s3 bucket notification message");
                stats.non_s3_records += 1;
                continue;
            }
            Err(err) => {
                warn!(record = %value, error = %err, "Skipping malformed bucket notification record");
                stats.malformed += 1;
                continue;
            }
        };

        let bucket = s3.bucket.and_then(|b| b.name);
        let raw_key = s3.object.and_then(|o| o.key);
        let (Some(bucket), Some(raw_key)) = (bucket, raw_key) else {
            warn!(record = %value, "Skipping bucket notification without bucket name or object key");
            stats.malformed += 1;
            continue;
        };

        let key = match decode_object_key(&raw_key) {
            Some(key) => key.into_owned(),
            None => {
                warn!(bucket = %bucket, key = %raw_key, "Skipping object key that is not valid UTF-8");
                stats.malformed += 1;
                continue;
            }
        };

        debug!(bucket = %bucket, key = %key, "Received notification for object");
        notifications.push(ObjectNotification { bucket, key });
    }

    (notifications, stats)
}

/// Decode an S3 event object key. Keys arrive form-encoded: `+` stands for
/// a space and reserved characters such as `=` are percent-escaped.
pub fn decode_object_key(raw: &str) -> Option<Cow<'_, str>> {
    if raw.contains('+') {
        let spaced = raw.replace('+', " ");
        return urlencoding::decode(&spaced)
            .ok()
            .map(|decoded| Cow::Owned(decoded.into_owned()));
    }
    urlencoding::decode(raw).ok()
}
