use crate::{DbAdapter, ExecResult, QueryResult, Row, TargetConnection, TargetError};
use async_trait::async_trait;
use oq_schemas::{BindParam, Dialect};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, Postgres, Transaction, TypeInfo};
use std::time::{Duration, Instant};

pub struct PostgresAdapter {
    pool: sqlx::PgPool,
}

impl PostgresAdapter {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, TargetError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| TargetError::Connect(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn begin(
        &self,
        statement_timeout: Duration,
        read_only: bool,
    ) -> Result<Box<dyn TargetConnection>, TargetError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TargetError::Connect(e.to_string()))?;

        sqlx::query(&format!(
            "SET statement_timeout = '{}ms'",
            statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| TargetError::Query(e.to_string()))?;

        if read_only {
            sqlx::query("SET TRANSACTION READ ONLY")
                .execute(&mut *tx)
                .await
                .map_err(|e| TargetError::Query(e.to_string()))?;
        }

        Ok(Box::new(PostgresConnection { tx: Some(tx) }))
    }
}

#[async_trait]
impl DbAdapter for PostgresAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn begin_read_only(
        &self,
        statement_timeout: Duration,
    ) -> Result<Box<dyn TargetConnection>, TargetError> {
        self.begin(statement_timeout, true).await
    }

    async fn begin_read_write(
        &self,
        statement_timeout: Duration,
    ) -> Result<Box<dyn TargetConnection>, TargetError> {
        self.begin(statement_timeout, false).await
    }
}

struct PostgresConnection {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresConnection {
    fn tx_mut(&mut self) -> Result<&mut Transaction<'static, Postgres>, TargetError> {
        self.tx
            .as_mut()
            .ok_or_else(|| TargetError::Query("connection already closed".to_string()))
    }
}

/// Convert a Postgres value to JSON by its reported type name. Types without
/// an explicit arm fall back to a string read, which covers enums, domains,
/// and most other scalar types `sqlx` can decode losslessly as text.
fn pg_value_to_json(row: &PgRow, index: usize, type_name: &str) -> serde_json::Value {
    use serde_json::Value;
    match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .and_then(|v| serde_json::Number::from_f64(v as f64))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "FLOAT8" | "NUMERIC" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" | "TIMESTAMP" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

fn row_to_json_map(row: &PgRow) -> Row {
    let mut map = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = pg_value_to_json(row, i, column.type_info().name());
        map.insert(column.name().to_string(), value);
    }
    map
}

#[async_trait]
impl TargetConnection for PostgresConnection {
    async fn explain(&mut self, sql: &str) -> Result<serde_json::Value, TargetError> {
        let tx = self.tx_mut()?;
        let plan: (serde_json::Value,) =
            sqlx::query_as(&format!("EXPLAIN (FORMAT JSON) {sql}"))
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| TargetError::Query(e.to_string()))?;
        Ok(plan.0)
    }

    async fn query(&mut self, sql: &str, max_rows: usize) -> Result<QueryResult, TargetError> {
        let started = Instant::now();
        let tx = self.tx_mut()?;
        let rows: Vec<PgRow> = sqlx::query(sql)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| TargetError::Query(e.to_string()))?;

        let truncated = rows.len() > max_rows;
        let rows: Vec<Row> = rows.iter().take(max_rows).map(row_to_json_map).collect();

        Ok(QueryResult {
            rows,
            truncated,
            exec_ms: started.elapsed().as_millis() as i64,
        })
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[BindParam],
    ) -> Result<ExecResult, TargetError> {
        let started = Instant::now();
        let tx = self.tx_mut()?;
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.value.to_string());
        }
        let result = query
            .execute(&mut **tx)
            .await
            .map_err(|e| TargetError::Query(e.to_string()))?;

        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            exec_ms: started.elapsed().as_millis() as i64,
        })
    }

    async fn rollback(&mut self) -> Result<(), TargetError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback()
                .await
                .map_err(|e| TargetError::Query(e.to_string()))?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), TargetError> {
        if let Some(tx) = self.tx.take() {
            tx.commit()
                .await
                .map_err(|e| TargetError::Query(e.to_string()))?;
        }
        Ok(())
    }
}
