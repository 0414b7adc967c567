//! Bucket to table resolution

use std::collections::{BTreeMap, HashMap};

/// How the table name for objects in a bucket is determined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableIdentity {
    /// Always this table, regardless of the object path
    Fixed(String),
    /// First segment of the object's directory path
    FromPath,
}

impl TableIdentity {
    /// Resolve the table name for an object living under `directory`.
    ///
    /// Returns `None` when a path-derived name would be empty.
    pub fn resolve<'a>(&'a self, directory: &'a str) -> Option<&'a str> {
        match self {
            TableIdentity::Fixed(name) => Some(name.as_str()),
            TableIdentity::FromPath => directory
                .split('/')
                .next()
                .filter(|segment| !segment.is_empty()),
        }
    }
}

/// Immutable bucket lookup, built once at startup
#[derive(Debug, Clone, Default)]
pub struct BucketTableMap {
    entries: HashMap<String, TableIdentity>,
}

impl BucketTableMap {
    /// Build from configured `bucket -> table` names. Tables listed in
    /// `fixed_tables` keep their configured name; all others are derived from
    /// each object's path.
    pub fn from_config<S: AsRef<str>>(
        buckets: &BTreeMap<String, String>,
        fixed_tables: &[S],
    ) -> Self {
        let entries = buckets
            .iter()
            .map(|(bucket, table)| {
                let identity = if fixed_tables.iter().any(|fixed| fixed.as_ref() == table) {
                    TableIdentity::Fixed(table.clone())
                } else {
                    TableIdentity::FromPath
                };
                (bucket.clone(), identity)
            })
            .collect();
        Self { entries }
    }

    pub fn with_entry(mut self, bucket: impl Into<String>, identity: TableIdentity) -> Self {
        self.entries.insert(bucket.into(), identity);
        self
    }

    pub fn get(&self, bucket: &str) -> Option<&TableIdentity> {
        self.entries.get(bucket)
    }
}
