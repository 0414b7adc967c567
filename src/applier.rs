//! Partition application
//!
//! Issues one `ALTER TABLE ... ADD IF NOT EXISTS` statement per table. The
//! statement is idempotent, so redelivered batches re-add nothing.

use crate::accumulator::PartitionTable;
use crate::error::ApplyError;
use crate::query_engine::QueryEngine;
use std::collections::BTreeMap;
use tracing::{error, info};

/// Tables and partition counts added by a successful apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub tables: BTreeMap<String, usize>,
}

impl ApplyReport {
    pub fn partitions_added(&self) -> usize {
        self.tables.values().sum()
    }
}

/// Render the batched add-partition statement for one table
pub fn add_partitions_statement(table: &str, partitions: &BTreeMap<String, String>) -> String {
    let partition_statement = partitions
        .iter()
        .map(|(expression, location)| format!("PARTITION {} LOCATION '{}'", expression, location))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "ALTER TABLE {} ADD IF NOT EXISTS {};",
        table, partition_statement
    )
}

pub struct PartitionApplier<'a, Q: QueryEngine + ?Sized> {
    engine: &'a Q,
}

impl<'a, Q: QueryEngine + ?Sized> PartitionApplier<'a, Q> {
    pub fn new(engine: &'a Q) -> Self {
        Self { engine }
    }

    /// Submit every table's partitions. Stops at the first failed statement;
    /// tables submitted before it stay applied and are named in the error.
    pub async fn apply(&self, partitions: &PartitionTable) -> Result<ApplyReport, ApplyError> {
        if partitions.is_empty() {
            error!("No partitions to add");
            return Err(ApplyError::NoPartitions);
        }

        let mut report = ApplyReport::default();
        for (table, table_partitions) in partitions {
            let query = add_partitions_statement(table, table_partitions);
            if !self.engine.submit(&query).await {
                error!(
                    table = %table,
                    applied_tables = report.tables.len(),
                    "Add hive partition query failed"
                );
                return Err(ApplyError::QueryFailed {
                    table: table.clone(),
                    query,
                    applied_tables: report.tables.into_keys().collect(),
                });
            }

            let added = serde_json::json!({ table.as_str(): table_partitions });
            info!(table = %table, partitions = %added, "Successfully added partitions");
            report.tables.insert(table.clone(), table_partitions.len());
        }

        Ok(report)
    }
}
