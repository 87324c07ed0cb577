use oq_schemas::{Classification, ProfileId};
use serde_json::{json, Value};

/// Payload builders for the write-family audit events (spec §3, §4.7).
/// None of these ever take the raw SQL text — only its hash, classification,
/// and impacted tables.

pub fn write_blocked(
    profile_id: ProfileId,
    classification: Classification,
    impacted_tables: &[String],
    sql_hash: &str,
    reason: &str,
) -> Value {
    json!({
        "profile_id": profile_id.to_string(),
        "classification": classification,
        "impacted_tables": impacted_tables,
        "sql_hash": sql_hash,
        "reason": reason,
    })
}

pub fn write_previewed(
    profile_id: ProfileId,
    classification: Classification,
    impacted_tables: &[String],
    sql_hash: &str,
) -> Value {
    json!({
        "profile_id": profile_id.to_string(),
        "classification": classification,
        "impacted_tables": impacted_tables,
        "sql_hash": sql_hash,
    })
}

pub fn write_confirmed(
    profile_id: ProfileId,
    classification: Classification,
    impacted_tables: &[String],
    sql_hash: &str,
) -> Value {
    write_previewed(profile_id, classification, impacted_tables, sql_hash)
}

pub fn write_executed(
    profile_id: ProfileId,
    classification: Classification,
    impacted_tables: &[String],
    sql_hash: &str,
    rows_affected: u64,
    exec_ms: i64,
) -> Value {
    json!({
        "profile_id": profile_id.to_string(),
        "classification": classification,
        "impacted_tables": impacted_tables,
        "sql_hash": sql_hash,
        "rows_affected": rows_affected,
        "exec_ms": exec_ms,
    })
}

pub fn write_failed(
    profile_id: ProfileId,
    classification: Classification,
    impacted_tables: &[String],
    sql_hash: &str,
    error: &str,
) -> Value {
    json!({
        "profile_id": profile_id.to_string(),
        "classification": classification,
        "impacted_tables": impacted_tables,
        "sql_hash": sql_hash,
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_never_carry_raw_sql() {
        let p = write_executed(
            ProfileId::new(),
            Classification::Write,
            &["users".to_string()],
            "abcdef0123456789",
            1,
            5,
        );
        let rendered = p.to_string();
        assert!(!rendered.contains("DELETE"));
        assert!(!rendered.contains("UPDATE"));
        assert!(rendered.contains("abcdef0123456789"));
    }
}
