use crate::ids::AuditEventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of audit event types (spec §3). Append-only: no update/delete
/// path exists anywhere in this crate or `oq-store`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ProfileCreated,
    ProfileRemoved,
    ProfileActivated,
    SchemaRefreshed,
    QueryRan,
    PowerEnabled,
    PowerDisabled,
    WriteBlocked,
    WritePreviewed,
    WriteConfirmed,
    WriteExecuted,
    WriteFailed,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::ProfileCreated => "profile_created",
            AuditEventType::ProfileRemoved => "profile_removed",
            AuditEventType::ProfileActivated => "profile_activated",
            AuditEventType::SchemaRefreshed => "schema_refreshed",
            AuditEventType::QueryRan => "query_ran",
            AuditEventType::PowerEnabled => "power_enabled",
            AuditEventType::PowerDisabled => "power_disabled",
            AuditEventType::WriteBlocked => "write_blocked",
            AuditEventType::WritePreviewed => "write_previewed",
            AuditEventType::WriteConfirmed => "write_confirmed",
            AuditEventType::WriteExecuted => "write_executed",
            AuditEventType::WriteFailed => "write_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile_created" => Some(AuditEventType::ProfileCreated),
            "profile_removed" => Some(AuditEventType::ProfileRemoved),
            "profile_activated" => Some(AuditEventType::ProfileActivated),
            "schema_refreshed" => Some(AuditEventType::SchemaRefreshed),
            "query_ran" => Some(AuditEventType::QueryRan),
            "power_enabled" => Some(AuditEventType::PowerEnabled),
            "power_disabled" => Some(AuditEventType::PowerDisabled),
            "write_blocked" => Some(AuditEventType::WriteBlocked),
            "write_previewed" => Some(AuditEventType::WritePreviewed),
            "write_confirmed" => Some(AuditEventType::WriteConfirmed),
            "write_executed" => Some(AuditEventType::WriteExecuted),
            "write_failed" => Some(AuditEventType::WriteFailed),
            _ => None,
        }
    }
}

/// An append-only, security-relevant record. `payload` never contains raw
/// SQL text — only `sql_hash` (first 16 hex chars of SHA-256), classification,
/// and impacted tables for write-family events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub at: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub payload: Value,
}

/// Length of `sql_hash` mandated by spec §4.7/§6.
pub const SQL_HASH_LEN: usize = 16;
