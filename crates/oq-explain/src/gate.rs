//! Pure plan-cost gate (spec §4.4 Evaluation). Stateless: the same summary
//! and thresholds always produce the same verdict.

use oq_policy::ModeConfig;
use oq_schemas::{ExplainEvaluation, ExplainSummary};

/// Evaluate a parsed plan summary against a mode's thresholds.
///
/// Rows/cost over threshold are hard blockers. A sequential scan is always a
/// warning, never a blocker — the caller may still want to know about it.
pub fn evaluate(summary: &ExplainSummary, mode_cfg: &ModeConfig) -> ExplainEvaluation {
    let mut blockers = Vec::new();
    let mut warnings = summary.warnings.clone();

    if summary.estimated_rows > mode_cfg.max_estimated_rows {
        blockers.push("estimated rows exceed threshold".to_string());
    }
    if summary.estimated_cost > mode_cfg.max_estimated_cost {
        blockers.push("estimated cost exceeds threshold".to_string());
    }
    if summary.has_seq_scan {
        warnings.push("plan contains a sequential scan".to_string());
    }

    ExplainEvaluation {
        allowed: blockers.is_empty(),
        warnings,
        blockers,
    }
}

/// Any plan-probe exception becomes a blocker, never a panic or silent pass.
pub fn evaluation_for_probe_failure(message: &str) -> ExplainEvaluation {
    ExplainEvaluation {
        allowed: false,
        warnings: Vec::new(),
        blockers: vec![format!("EXPLAIN failed: {message}")],
    }
}
