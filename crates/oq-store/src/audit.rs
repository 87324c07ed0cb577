use crate::{Store, StoreError};
use oq_schemas::{AuditEvent, AuditEventId, AuditEventType};
use sqlx::Row;

impl Store {
    /// Appends one audit event. There is no corresponding update/delete
    /// method anywhere in this crate — the table is append-only by omission.
    pub async fn append_audit_event(
        &self,
        event_type: AuditEventType,
        payload: serde_json::Value,
    ) -> Result<AuditEvent, StoreError> {
        let event = AuditEvent {
            id: AuditEventId::new(),
            at: chrono::Utc::now(),
            event_type,
            payload,
        };

        let payload_json = serde_json::to_string(&event.payload).map_err(|e| {
            StoreError::CorruptRow {
                table: "audit_events",
                detail: e.to_string(),
            }
        })?;

        sqlx::query("INSERT INTO audit_events (id, at, event_type, payload) VALUES (?, ?, ?, ?)")
            .bind(event.id.to_string())
            .bind(crate::format_timestamp(event.at))
            .bind(event.event_type.as_str())
            .bind(payload_json)
            .execute(&self.pool)
            .await?;

        Ok(event)
    }

    /// Most recent events first, optionally capped at `limit`.
    pub async fn list_audit(&self, limit: i64) -> Result<Vec<AuditEvent>, StoreError> {
        let rows = sqlx::query("SELECT * FROM audit_events ORDER BY at DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_audit_event).collect()
    }
}

fn row_to_audit_event(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEvent, StoreError> {
    let id_raw: String = row.try_get("id")?;
    let at_raw: String = row.try_get("at")?;
    let event_type_raw: String = row.try_get("event_type")?;
    let payload_raw: String = row.try_get("payload")?;

    Ok(AuditEvent {
        id: AuditEventId::from(uuid::Uuid::parse_str(&id_raw).map_err(|e| {
            StoreError::CorruptRow {
                table: "audit_events",
                detail: e.to_string(),
            }
        })?),
        at: chrono::DateTime::parse_from_rfc3339(&at_raw)
            .map_err(|e| StoreError::CorruptRow {
                table: "audit_events",
                detail: e.to_string(),
            })?
            .with_timezone(&chrono::Utc),
        event_type: AuditEventType::parse(&event_type_raw).ok_or_else(|| StoreError::CorruptRow {
            table: "audit_events",
            detail: format!("unknown event_type {event_type_raw}"),
        })?,
        payload: serde_json::from_str(&payload_raw).map_err(|e| StoreError::CorruptRow {
            table: "audit_events",
            detail: e.to_string(),
        })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::migrated_store;
    use serde_json::json;

    #[tokio::test]
    async fn appends_and_lists_most_recent_first() {
        let store = migrated_store().await;
        store
            .append_audit_event(AuditEventType::ProfileCreated, json!({"profile_id": "a"}))
            .await
            .unwrap();
        store
            .append_audit_event(AuditEventType::WriteBlocked, json!({"reason": "select *"}))
            .await
            .unwrap();

        let events = store.list_audit(10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::WriteBlocked);
        assert_eq!(events[1].event_type, AuditEventType::ProfileCreated);
    }

    #[tokio::test]
    async fn list_audit_respects_limit() {
        let store = migrated_store().await;
        for _ in 0..5 {
            store
                .append_audit_event(AuditEventType::QueryRan, json!({}))
                .await
                .unwrap();
        }
        let events = store.list_audit(3).await.unwrap();
        assert_eq!(events.len(), 3);
    }
}
