use crate::ids::{ProfileId, SchemaSnapshotId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: Option<String>,
    pub name: String,
    pub row_count_estimate: Option<i64>,
    pub columns: Vec<ColumnInfo>,
}

/// Captured description of a profile's tables and columns. Used only as LLM
/// context and for the schema-explorer UI; never trusted for policy
/// decisions (see spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub id: SchemaSnapshotId,
    pub profile_id: ProfileId,
    pub tables: Vec<TableInfo>,
    pub captured_at: DateTime<Utc>,
}
