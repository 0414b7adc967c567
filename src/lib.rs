//! Hive partition refresh for S3-backed query engine tables
//!
//! Turns queued S3 bucket notifications into idempotent
//! `ALTER TABLE ... ADD IF NOT EXISTS PARTITION` statements so newly written
//! objects become queryable. The crate holds the decision logic only; queue
//! delivery and the query engine client are supplied by the runtime crate.

pub mod accumulator;
pub mod applier;
pub mod error;
pub mod key_matcher;
pub mod notification;
pub mod query_engine;
pub mod runner;
pub mod table_map;

pub use accumulator::{PartitionAccumulator, PartitionTable};
pub use applier::{ApplyReport, PartitionApplier};
pub use error::{ApplyError, ErrorKind, RefreshError};
pub use key_matcher::{match_key, KeyPattern, PartitionKey};
pub use notification::{ObjectNotification, QueueRecord, UnpackStats};
pub use query_engine::QueryEngine;
pub use runner::{BatchRunner, RunReport};
pub use table_map::{BucketTableMap, TableIdentity};
