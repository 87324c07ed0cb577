//! C7 — Write Executor + Auditor (spec §4.7). Executes a confirmed write
//! inside a transaction and computes the figures the orchestrator needs to
//! emit `write_executed`/`write_failed` audit events in order.

pub mod hash;
pub mod payload;

pub use hash::sql_hash;

use oq_schemas::BindParam;
use oq_target::TargetConnection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Target(#[from] oq_target::TargetError),
}

#[derive(Debug, Clone)]
pub struct ExecutedWrite {
    pub rows_affected: u64,
    pub exec_ms: i64,
    pub sql_hash: String,
}

#[derive(Debug, Clone)]
pub struct FailedWrite {
    pub error: String,
    pub sql_hash: String,
}

/// Execute `sql` with `params` inside `conn`. Commits on success, rolls back
/// on any failure before propagating. `conn` must already be a read-write
/// transaction opened with the profile's statement timeout.
pub async fn execute_write(
    conn: &mut dyn TargetConnection,
    sql: &str,
    params: &[BindParam],
) -> Result<ExecutedWrite, FailedWrite> {
    let digest = sql_hash(sql);

    match conn.execute(sql, params).await {
        Ok(result) => {
            if let Err(e) = conn.commit().await {
                return Err(FailedWrite {
                    error: e.to_string(),
                    sql_hash: digest,
                });
            }
            Ok(ExecutedWrite {
                rows_affected: result.rows_affected,
                exec_ms: result.exec_ms,
                sql_hash: digest,
            })
        }
        Err(e) => {
            // Best-effort rollback; the original error is what's reported.
            let _ = conn.rollback().await;
            Err(FailedWrite {
                error: e.to_string(),
                sql_hash: digest,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oq_target::{ExecResult, QueryResult, TargetError};

    struct FakeConn {
        execute_result: Result<ExecResult, String>,
        committed: bool,
        rolled_back: bool,
    }

    #[async_trait]
    impl TargetConnection for FakeConn {
        async fn explain(&mut self, _sql: &str) -> Result<serde_json::Value, TargetError> {
            unreachable!()
        }

        async fn query(&mut self, _sql: &str, _max_rows: usize) -> Result<QueryResult, TargetError> {
            unreachable!()
        }

        async fn execute(
            &mut self,
            _sql: &str,
            _params: &[BindParam],
        ) -> Result<ExecResult, TargetError> {
            self.execute_result
                .as_ref()
                .map(|r| ExecResult {
                    rows_affected: r.rows_affected,
                    exec_ms: r.exec_ms,
                })
                .map_err(|e| TargetError::Query(e.clone()))
        }

        async fn rollback(&mut self) -> Result<(), TargetError> {
            self.rolled_back = true;
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), TargetError> {
            self.committed = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn success_commits_and_reports_rows() {
        let mut conn = FakeConn {
            execute_result: Ok(ExecResult {
                rows_affected: 3,
                exec_ms: 12,
            }),
            committed: false,
            rolled_back: false,
        };
        let outcome = execute_write(&mut conn, "DELETE FROM users WHERE id = 1", &[])
            .await
            .unwrap();
        assert!(conn.committed);
        assert!(!conn.rolled_back);
        assert_eq!(outcome.rows_affected, 3);
        assert_eq!(outcome.sql_hash.len(), oq_schemas::SQL_HASH_LEN);
    }

    #[tokio::test]
    async fn failure_rolls_back_and_reports_error() {
        let mut conn = FakeConn {
            execute_result: Err("constraint violation".to_string()),
            committed: false,
            rolled_back: false,
        };
        let outcome = execute_write(&mut conn, "DELETE FROM users WHERE id = 1", &[])
            .await
            .unwrap_err();
        assert!(conn.rolled_back);
        assert!(!conn.committed);
        assert!(outcome.error.contains("constraint violation"));
    }
}
