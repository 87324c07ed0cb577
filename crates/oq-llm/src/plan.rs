use oq_schemas::{BindParam, Dialect, Mode};
use serde::{Deserialize, Serialize};

/// Everything the generator needs to turn a question into a candidate
/// statement (spec §4.11). `schema_subset` is deliberately narrow — the
/// caller decides what schema context is relevant, never the whole snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePlanRequest {
    pub question: String,
    pub schema_subset: serde_json::Value,
    pub dialect: Dialect,
    pub mode: Mode,
    pub blocked_tables: Vec<String>,
}

/// A candidate SQL statement plus the generator's own self-assessment.
/// Still subject to C1-C7 — nothing here is trusted for policy decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub sql: String,
    pub params: Vec<BindParam>,
    pub assumptions: Vec<String>,
    pub safety_notes: Vec<String>,
    pub confidence: f64,
    pub referenced_entities: Vec<String>,
}
