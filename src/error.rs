//! Error types for partition refresh

use thiserror::Error;

/// Fatal error classes, for callers deciding how to report a failed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The target database is missing; nothing was processed
    Precondition,
    /// Partitions could not be applied, or there were none to apply
    Application,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precondition => "PreconditionFailure",
            Self::Application => "ApplicationFailure",
        }
    }
}

/// Failures while submitting partition statements
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Nothing was accumulated, so no statement was issued
    #[error("no partitions to add")]
    NoPartitions,

    /// The query engine rejected or failed a statement. Tables listed in
    /// `applied_tables` were already updated before the failure.
    #[error("the add hive partition query has failed for table '{table}':\n{query}")]
    QueryFailed {
        table: String,
        query: String,
        applied_tables: Vec<String>,
    },
}

/// Errors that fail a whole invocation
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Database check failed before any record was processed
    #[error("the '{database}' database does not exist")]
    DatabaseNotFound { database: String },

    /// Partition application failed; `summary` lists the accumulated inputs
    #[error("failed to add partitions ({source}); received objects: {summary}")]
    Apply {
        summary: String,
        #[source]
        source: ApplyError,
    },
}

impl RefreshError {
    pub fn database_not_found(database: impl Into<String>) -> Self {
        Self::DatabaseNotFound {
            database: database.into(),
        }
    }

    pub fn apply(summary: String, source: ApplyError) -> Self {
        Self::Apply { summary, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseNotFound { .. } => ErrorKind::Precondition,
            Self::Apply { .. } => ErrorKind::Application,
        }
    }
}

/// Result type alias for RefreshError
pub type Result<T> = std::result::Result<T, RefreshError>;
