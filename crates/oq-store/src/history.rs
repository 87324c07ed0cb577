use crate::{Store, StoreError};
use oq_schemas::{
    BindParam, Dialect, ExplainSummary, GenerationId, GenerationRecord, Mode, ProfileId,
    QueryId, QueryRecord, RunId, RunRecord, RunStatus,
};
use sqlx::Row;

impl Store {
    pub async fn insert_query_record(
        &self,
        profile_id: ProfileId,
        question: Option<String>,
        mode: Mode,
        dialect: Dialect,
    ) -> Result<QueryRecord, StoreError> {
        let record = QueryRecord {
            id: QueryId::new(),
            profile_id,
            asked_at: chrono::Utc::now(),
            question,
            mode,
            dialect,
        };

        sqlx::query(
            "INSERT INTO queries (id, profile_id, asked_at, question, mode, dialect) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.profile_id.to_string())
        .bind(crate::format_timestamp(record.asked_at))
        .bind(&record.question)
        .bind(record.mode.as_str())
        .bind(record.dialect.as_str())
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn insert_generation_record(
        &self,
        query_id: QueryId,
        generated_sql: String,
        params: Vec<BindParam>,
        confidence: f64,
        assumptions: Vec<String>,
        safety_notes: Vec<String>,
    ) -> Result<GenerationRecord, StoreError> {
        let record = GenerationRecord {
            id: GenerationId::new(),
            query_id,
            generated_sql,
            params,
            confidence,
            assumptions,
            safety_notes,
        };

        let params_json = serde_json::to_string(&record.params).map_err(json_err("generations"))?;
        let assumptions_json =
            serde_json::to_string(&record.assumptions).map_err(json_err("generations"))?;
        let notes_json =
            serde_json::to_string(&record.safety_notes).map_err(json_err("generations"))?;

        sqlx::query(
            r#"
            INSERT INTO generations
                (id, query_id, generated_sql, params, confidence, assumptions, safety_notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.query_id.to_string())
        .bind(&record.generated_sql)
        .bind(params_json)
        .bind(record.confidence)
        .bind(assumptions_json)
        .bind(notes_json)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn insert_run_record(
        &self,
        query_id: QueryId,
        rewritten_sql: Option<String>,
        explain_summary: Option<ExplainSummary>,
        exec_ms: Option<i64>,
        row_count: Option<i64>,
        truncated: bool,
        status: RunStatus,
        error_text: Option<String>,
    ) -> Result<RunRecord, StoreError> {
        let record = RunRecord {
            id: RunId::new(),
            query_id,
            rewritten_sql,
            explain_summary,
            exec_ms,
            row_count,
            truncated,
            status,
            error_text,
        };

        let explain_json = record
            .explain_summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(json_err("runs"))?;

        sqlx::query(
            r#"
            INSERT INTO runs
                (id, query_id, rewritten_sql, explain_summary, exec_ms, row_count,
                 truncated, status, error_text)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.query_id.to_string())
        .bind(&record.rewritten_sql)
        .bind(explain_json)
        .bind(record.exec_ms)
        .bind(record.row_count)
        .bind(record.truncated)
        .bind(record.status.as_str())
        .bind(&record.error_text)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// Query + generation + run records for one profile, most recent first.
    pub async fn list_history(
        &self,
        profile_id: ProfileId,
        limit: i64,
    ) -> Result<Vec<QueryRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM queries WHERE profile_id = ? ORDER BY asked_at DESC LIMIT ?",
        )
        .bind(profile_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_query_record).collect()
    }

    pub async fn get_history(&self, id: QueryId) -> Result<QueryRecord, StoreError> {
        let row = sqlx::query("SELECT * FROM queries WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::QueryNotFound(id.to_string()))?;
        row_to_query_record(&row)
    }
}

fn json_err(table: &'static str) -> impl Fn(serde_json::Error) -> StoreError {
    move |e| StoreError::CorruptRow {
        table,
        detail: e.to_string(),
    }
}

fn row_to_query_record(row: &sqlx::sqlite::SqliteRow) -> Result<QueryRecord, StoreError> {
    let id_raw: String = row.try_get("id")?;
    let profile_raw: String = row.try_get("profile_id")?;
    let asked_raw: String = row.try_get("asked_at")?;
    let mode_raw: String = row.try_get("mode")?;
    let dialect_raw: String = row.try_get("dialect")?;

    Ok(QueryRecord {
        id: QueryId::from(uuid::Uuid::parse_str(&id_raw).map_err(json_uuid_err("queries"))?),
        profile_id: ProfileId::from(
            uuid::Uuid::parse_str(&profile_raw).map_err(json_uuid_err("queries"))?,
        ),
        asked_at: chrono::DateTime::parse_from_rfc3339(&asked_raw)
            .map_err(|e| StoreError::CorruptRow {
                table: "queries",
                detail: e.to_string(),
            })?
            .with_timezone(&chrono::Utc),
        question: row.try_get("question")?,
        mode: Mode::parse(&mode_raw).ok_or_else(|| StoreError::CorruptRow {
            table: "queries",
            detail: format!("unknown mode {mode_raw}"),
        })?,
        dialect: Dialect::parse(&dialect_raw).ok_or_else(|| StoreError::CorruptRow {
            table: "queries",
            detail: format!("unknown dialect {dialect_raw}"),
        })?,
    })
}

fn json_uuid_err(table: &'static str) -> impl Fn(uuid::Error) -> StoreError {
    move |e| StoreError::CorruptRow {
        table,
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::migrated_store;
    use oq_schemas::ProfileSpec;

    async fn sample_profile_id(store: &Store) -> ProfileId {
        let spec = ProfileSpec {
            name: "local".to_string(),
            dialect: Dialect::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            database: "app".to_string(),
            user: "app".to_string(),
            ssl: false,
        };
        store.create_profile(spec).await.unwrap().id
    }

    #[tokio::test]
    async fn inserts_and_lists_full_chain() {
        let store = migrated_store().await;
        let profile_id = sample_profile_id(&store).await;

        let query = store
            .insert_query_record(
                profile_id,
                Some("how many users?".to_string()),
                Mode::Standard,
                Dialect::Postgres,
            )
            .await
            .unwrap();

        store
            .insert_generation_record(
                query.id,
                "SELECT count(*) FROM users".to_string(),
                vec![],
                0.9,
                vec![],
                vec![],
            )
            .await
            .unwrap();

        store
            .insert_run_record(
                query.id,
                Some("SELECT count(*) FROM users LIMIT 1000".to_string()),
                None,
                Some(4),
                Some(1),
                false,
                RunStatus::Ok,
                None,
            )
            .await
            .unwrap();

        let history = store.list_history(profile_id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id.as_uuid(), query.id.as_uuid());

        let fetched = store.get_history(query.id).await.unwrap();
        assert_eq!(fetched.question.as_deref(), Some("how many users?"));
    }

    #[tokio::test]
    async fn list_history_respects_limit_and_order() {
        let store = migrated_store().await;
        let profile_id = sample_profile_id(&store).await;

        for i in 0..3 {
            store
                .insert_query_record(
                    profile_id,
                    Some(format!("question {i}")),
                    Mode::Safe,
                    Dialect::Postgres,
                )
                .await
                .unwrap();
        }

        let history = store.list_history(profile_id, 2).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn get_history_missing_id_errors() {
        let store = migrated_store().await;
        let err = store.get_history(QueryId::new()).await;
        assert!(matches!(err, Err(StoreError::QueryNotFound(_))));
    }
}
