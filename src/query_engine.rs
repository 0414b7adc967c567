// Query engine abstraction
//
// Implementations:
// - AthenaQueryEngine (AWS Lambda runtime crate)
// - recording mocks in tests

use async_trait::async_trait;

/// Query engine that owns the target database's partition metadata.
///
/// Implementations block (await) until a submitted statement reaches a
/// terminal state; polling and client errors are their concern and surface
/// here only as `false`.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Name of the database statements run against
    fn database(&self) -> &str;

    /// Whether the target database exists
    async fn database_exists(&self) -> bool;

    /// Run `query` to completion; `true` when it succeeded
    async fn submit(&self, query: &str) -> bool;
}
