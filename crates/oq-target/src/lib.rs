//! Dialect-generic adapter trait for the database a profile points at,
//! consumed by C4 (EXPLAIN gate + guarded reads) and C7 (write executor).
//! Only a Postgres implementation ships; the trait is kept dialect-generic
//! per spec §6 so MySql/Sqlite targets can be added without touching C4/C7.

pub mod postgres;

use async_trait::async_trait;
use oq_schemas::Dialect;
use std::time::Duration;
use thiserror::Error;

/// Env var integration tests connect through, mirroring the teacher's
/// `MQK_DATABASE_URL` convention.
pub const ENV_TARGET_DATABASE_URL: &str = "OQ_TARGET_DATABASE_URL";

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("failed to connect to target database: {0}")]
    Connect(String),
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),
    #[error("query execution failed: {0}")]
    Query(String),
}

/// One row back from a guarded read, column name paired with its JSON
/// representation (the adapter is responsible for converting driver-native
/// types).
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub truncated: bool,
    pub exec_ms: i64,
}

#[derive(Debug, Clone)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub exec_ms: i64,
}

/// A connection scoped to a single guarded operation: statement timeout is
/// already set, and the transaction kind (read-only vs read-write) is fixed
/// for its lifetime.
#[async_trait]
pub trait TargetConnection: Send {
    async fn explain(&mut self, sql: &str) -> Result<serde_json::Value, TargetError>;

    async fn query(&mut self, sql: &str, max_rows: usize) -> Result<QueryResult, TargetError>;

    async fn execute(
        &mut self,
        sql: &str,
        params: &[oq_schemas::BindParam],
    ) -> Result<ExecResult, TargetError>;

    async fn rollback(&mut self) -> Result<(), TargetError>;

    async fn commit(&mut self) -> Result<(), TargetError>;
}

/// Connects to a profile's target database and opens guarded transactions.
/// Every method brackets driver operations so the connection is released on
/// every exit path, including errors.
#[async_trait]
pub trait DbAdapter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Open a read-only transaction with the given statement timeout. The
    /// returned connection cannot mutate state; `commit`ing it is a no-op
    /// rollback-equivalent (reads never need to persist anything).
    async fn begin_read_only(
        &self,
        statement_timeout: Duration,
    ) -> Result<Box<dyn TargetConnection>, TargetError>;

    /// Open a read-write transaction with the given statement timeout.
    async fn begin_read_write(
        &self,
        statement_timeout: Duration,
    ) -> Result<Box<dyn TargetConnection>, TargetError>;
}
