//! Partition accumulation
//!
//! Resolves each `(bucket, key)` pair to a table, partition expression and
//! S3 location, collapsing duplicates so each partition is added once per
//! invocation.

use crate::key_matcher::match_key;
use crate::table_map::BucketTableMap;
use serde::Serialize;
use std::collections::{btree_map, BTreeMap, BTreeSet};
use tracing::{debug, error};

/// Partitions to add: `table -> (partition expression -> location)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PartitionTable {
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl PartitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a partition; an existing expression for the table is
    /// overwritten with the new location.
    pub fn insert(
        &mut self,
        table: impl Into<String>,
        expression: impl Into<String>,
        location: impl Into<String>,
    ) {
        self.tables
            .entry(table.into())
            .or_default()
            .insert(expression.into(), location.into());
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of distinct tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Total number of partitions across all tables
    pub fn partition_count(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    pub fn partitions(&self, table: &str) -> Option<&BTreeMap<String, String>> {
        self.tables.get(table)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, BTreeMap<String, String>> {
        self.tables.iter()
    }
}

impl<'a> IntoIterator for &'a PartitionTable {
    type Item = (&'a String, &'a BTreeMap<String, String>);
    type IntoIter = btree_map::Iter<'a, String, BTreeMap<String, String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builds a [`PartitionTable`] for one invocation
pub struct PartitionAccumulator<'a> {
    buckets: &'a BucketTableMap,
    partitions: PartitionTable,
    received: BTreeMap<String, BTreeSet<String>>,
    unmapped: usize,
    unmatched: usize,
}

impl<'a> PartitionAccumulator<'a> {
    pub fn new(buckets: &'a BucketTableMap) -> Self {
        Self {
            buckets,
            partitions: PartitionTable::new(),
            received: BTreeMap::new(),
            unmapped: 0,
            unmatched: 0,
        }
    }

    /// Record one object notification. Unmapped buckets and unrecognized
    /// keys are logged and skipped.
    pub fn add(&mut self, bucket: &str, key: &str) {
        let first_seen = self
            .received
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string());
        if !first_seen {
            debug!(bucket = %bucket, key = %key, "Duplicate object notification");
            return;
        }

        let buckets = self.buckets;
        let Some(identity) = buckets.get(bucket) else {
            self.unmapped += 1;
            error!(
                bucket = %bucket,
                "Bucket not found in 'buckets' config; add it to enable Hive partition additions"
            );
            return;
        };

        let Some(partition_key) = match_key(key) else {
            self.unmatched += 1;
            error!(key = %key, bucket = %bucket, "Object key does not match any known pattern, skipping");
            return;
        };

        let directory = parent_directory(key);
        let Some(table) = identity.resolve(directory) else {
            self.unmatched += 1;
            error!(key = %key, bucket = %bucket, "Unable to derive a table name from object key, skipping");
            return;
        };

        let expression = partition_key.expression();
        let location = format!("s3://{}/{}", bucket, directory);
        debug!(
            table = %table,
            partition = %expression,
            location = %location,
            pattern = %partition_key.pattern,
            "Resolved partition"
        );
        self.partitions.insert(table, expression, location);
    }

    /// Buckets that were not present in the table mapping
    pub fn unmapped(&self) -> usize {
        self.unmapped
    }

    /// Keys that matched no pattern or yielded no table name
    pub fn unmatched(&self) -> usize {
        self.unmatched
    }

    /// Distinct `(bucket, key)` pairs seen so far
    pub fn received_count(&self) -> usize {
        self.received.values().map(BTreeSet::len).sum()
    }

    /// JSON rendering of every received `bucket -> [keys]`, for error reports
    pub fn received_summary(&self) -> String {
        serde_json::to_string(&self.received).unwrap_or_default()
    }

    pub fn partitions(&self) -> &PartitionTable {
        &self.partitions
    }

    pub fn finish(self) -> PartitionTable {
        self.partitions
    }
}

/// Key with its final path segment removed
fn parent_directory(key: &str) -> &str {
    key.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}
