use serde::{Deserialize, Serialize};

/// Parsed estimates from a plan probe (C4). Malformed plans yield
/// `estimated_rows = estimated_cost = 0` with a warning and never block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainSummary {
    pub estimated_rows: i64,
    pub estimated_cost: f64,
    pub has_seq_scan: bool,
    pub seq_scan_relations: Vec<String>,
    pub warnings: Vec<String>,
}

/// Blocker/warning evaluation of an `ExplainSummary` against mode thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainEvaluation {
    pub allowed: bool,
    pub warnings: Vec<String>,
    pub blockers: Vec<String>,
}
