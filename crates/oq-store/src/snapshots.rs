use crate::{Store, StoreError};
use chrono::Utc;
use oq_schemas::{ProfileId, SchemaSnapshot, SchemaSnapshotId, TableInfo};
use sqlx::Row;

impl Store {
    pub async fn store_schema_snapshot(
        &self,
        profile_id: ProfileId,
        tables: Vec<TableInfo>,
    ) -> Result<SchemaSnapshot, StoreError> {
        let snapshot = SchemaSnapshot {
            id: SchemaSnapshotId::new(),
            profile_id,
            tables,
            captured_at: Utc::now(),
        };

        let tables_json = serde_json::to_string(&snapshot.tables).map_err(|e| {
            StoreError::CorruptRow {
                table: "schema_snapshots",
                detail: e.to_string(),
            }
        })?;

        sqlx::query(
            "INSERT INTO schema_snapshots (id, profile_id, tables, captured_at) VALUES (?, ?, ?, ?)",
        )
        .bind(snapshot.id.to_string())
        .bind(snapshot.profile_id.to_string())
        .bind(tables_json)
        .bind(crate::format_timestamp(snapshot.captured_at))
        .execute(&self.pool)
        .await?;

        Ok(snapshot)
    }

    /// Most recently captured snapshot for a profile, if one exists. Never
    /// used for policy decisions (spec §3) — schema-explorer/LLM context only.
    pub async fn latest_schema_snapshot(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<SchemaSnapshot>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM schema_snapshots WHERE profile_id = ? ORDER BY captured_at DESC LIMIT 1",
        )
        .bind(profile_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id_raw: String = row.try_get("id")?;
        let tables_raw: String = row.try_get("tables")?;
        let captured_raw: String = row.try_get("captured_at")?;

        Ok(Some(SchemaSnapshot {
            id: SchemaSnapshotId::from(uuid::Uuid::parse_str(&id_raw).map_err(|e| {
                StoreError::CorruptRow {
                    table: "schema_snapshots",
                    detail: e.to_string(),
                }
            })?),
            profile_id,
            tables: serde_json::from_str(&tables_raw).map_err(|e| StoreError::CorruptRow {
                table: "schema_snapshots",
                detail: e.to_string(),
            })?,
            captured_at: chrono::DateTime::parse_from_rfc3339(&captured_raw)
                .map_err(|e| StoreError::CorruptRow {
                    table: "schema_snapshots",
                    detail: e.to_string(),
                })?
                .with_timezone(&Utc),
        }))
    }
}
