use crate::{Classification, StatementKind};
use serde::{Deserialize, Serialize};

/// Output of C5: a side-effect-free summary produced before confirmation
/// (spec §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritePreview {
    pub classification: Classification,
    pub kind: StatementKind,
    pub impacted_tables: Vec<String>,
    pub has_where_clause: bool,
    pub summary: String,
    pub estimated_rows_affected: Option<i64>,
    pub explain_plan: Option<serde_json::Value>,
    pub warnings: Vec<String>,
    pub requires_confirmation: bool,
    pub confirmation_phrase: String,
    pub requires_dangerous_confirmation: bool,
    pub dangerous_confirmation_phrase: Option<String>,
}
