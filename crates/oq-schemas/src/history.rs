use crate::explain::ExplainSummary;
use crate::ids::{GenerationId, ProfileId, QueryId, RunId};
use crate::profile::Dialect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Safe,
    Standard,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Safe => "safe",
            Mode::Standard => "standard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "safe" => Some(Mode::Safe),
            "standard" => Some(Mode::Standard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Blocked,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Blocked => "blocked",
            RunStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(RunStatus::Ok),
            "blocked" => Some(RunStatus::Blocked),
            "error" => Some(RunStatus::Error),
            _ => None,
        }
    }
}

/// One bind parameter as surfaced by the LLM contract / orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindParam {
    pub name: String,
    pub r#type: String,
    pub value: serde_json::Value,
}

/// History record for one ask/run (spec §3 "Query record"). Immutable once
/// written; result rows are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: QueryId,
    pub profile_id: ProfileId,
    pub asked_at: DateTime<Utc>,
    pub question: Option<String>,
    pub mode: Mode,
    pub dialect: Dialect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: GenerationId,
    pub query_id: QueryId,
    pub generated_sql: String,
    pub params: Vec<BindParam>,
    pub confidence: f64,
    pub assumptions: Vec<String>,
    pub safety_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    pub query_id: QueryId,
    pub rewritten_sql: Option<String>,
    pub explain_summary: Option<ExplainSummary>,
    pub exec_ms: Option<i64>,
    pub row_count: Option<i64>,
    pub truncated: bool,
    pub status: RunStatus,
    pub error_text: Option<String>,
}
