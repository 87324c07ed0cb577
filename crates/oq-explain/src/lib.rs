//! C4 — EXPLAIN Gate and guarded read execution (spec §4.4).

pub mod gate;
pub mod plan_parse;

use oq_policy::ModeConfig;
use oq_schemas::{ExplainEvaluation, ExplainSummary};
use oq_target::{DbAdapter, QueryResult, TargetError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error(transparent)]
    Target(#[from] TargetError),
}

#[derive(Debug, Clone)]
pub struct GuardedReadOutcome {
    pub summary: Option<ExplainSummary>,
    pub evaluation: ExplainEvaluation,
    pub result: Option<QueryResult>,
}

/// Run the EXPLAIN probe, evaluate it, and — if it's required and it
/// passes — execute the guarded read. If `require_explain` is false the
/// probe is skipped entirely and the read runs unconditionally.
pub async fn run_guarded_read(
    adapter: &dyn DbAdapter,
    sql: &str,
    mode_cfg: &ModeConfig,
    max_rows: usize,
    statement_timeout: Duration,
) -> Result<GuardedReadOutcome, ExplainError> {
    let (summary, evaluation) = if mode_cfg.require_explain {
        let mut probe_conn = adapter.begin_read_only(statement_timeout).await?;
        let probed = probe_conn.explain(sql).await;
        // Never commit the probe transaction: it exists only to run EXPLAIN.
        probe_conn.rollback().await?;

        match probed {
            Ok(raw) => {
                let summary = plan_parse::parse_plan(&raw);
                let evaluation = gate::evaluate(&summary, mode_cfg);
                (Some(summary), evaluation)
            }
            Err(e) => (None, gate::evaluation_for_probe_failure(&e.to_string())),
        }
    } else {
        (
            None,
            ExplainEvaluation {
                allowed: true,
                warnings: Vec::new(),
                blockers: Vec::new(),
            },
        )
    };

    if !evaluation.allowed {
        return Ok(GuardedReadOutcome {
            summary,
            evaluation,
            result: None,
        });
    }

    let mut read_conn = adapter.begin_read_only(statement_timeout).await?;
    let result = read_conn.query(sql, max_rows).await;
    read_conn.rollback().await?;

    Ok(GuardedReadOutcome {
        summary,
        evaluation,
        result: Some(result?),
    })
}
