//! Schema capture for `oq schema refresh`. Runs a single information_schema
//! query through the same guarded read-only transaction every other read
//! uses, then groups the flat column rows into `TableInfo`/`ColumnInfo`.
//! Never consulted for policy decisions — LLM context and schema-explorer
//! display only (spec §3).

use anyhow::{Context, Result};
use oq_schemas::{ColumnInfo, TableInfo};
use oq_target::DbAdapter;
use std::time::Duration;

const INTROSPECTION_SQL: &str = r#"
SELECT
    c.table_schema,
    c.table_name,
    c.column_name,
    c.data_type,
    c.is_nullable = 'YES' AS is_nullable,
    c.column_default,
    pk.column_name IS NOT NULL AS is_primary_key
FROM information_schema.columns c
LEFT JOIN (
    SELECT kcu.table_schema, kcu.table_name, kcu.column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON kcu.constraint_name = tc.constraint_name
       AND kcu.table_schema = tc.table_schema
    WHERE tc.constraint_type = 'PRIMARY KEY'
) pk
    ON pk.table_schema = c.table_schema
   AND pk.table_name = c.table_name
   AND pk.column_name = c.column_name
WHERE c.table_schema NOT IN ('pg_catalog', 'information_schema')
ORDER BY c.table_schema, c.table_name, c.ordinal_position
"#;

const MAX_INTROSPECTION_ROWS: usize = 100_000;

/// Runs the introspection query in a read-only transaction and groups the
/// resulting columns by (schema, table). `row_count_estimate` is left `None`
/// — the spec marks it as UI-cache-only, not worth a second round trip here.
pub async fn capture(
    adapter: &dyn DbAdapter,
    statement_timeout: Duration,
) -> Result<Vec<TableInfo>> {
    let mut conn = adapter
        .begin_read_only(statement_timeout)
        .await
        .context("opening read-only transaction for schema introspection")?;

    let result = conn
        .query(INTROSPECTION_SQL, MAX_INTROSPECTION_ROWS)
        .await
        .context("running information_schema introspection query")?;
    conn.rollback().await.context("rolling back introspection transaction")?;

    let mut tables: Vec<TableInfo> = Vec::new();

    for row in result.rows {
        let schema = row.get("table_schema").and_then(|v| v.as_str()).map(str::to_string);
        let table_name = row
            .get("table_name")
            .and_then(|v| v.as_str())
            .context("introspection row missing table_name")?
            .to_string();

        let column = ColumnInfo {
            name: row
                .get("column_name")
                .and_then(|v| v.as_str())
                .context("introspection row missing column_name")?
                .to_string(),
            data_type: row
                .get("data_type")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            nullable: row
                .get("is_nullable")
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
            is_primary_key: row
                .get("is_primary_key")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            default: row
                .get("column_default")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };

        match tables
            .iter_mut()
            .find(|t| t.schema.as_deref() == schema.as_deref() && t.name == table_name)
        {
            Some(table) => table.columns.push(column),
            None => tables.push(TableInfo {
                schema,
                name: table_name,
                row_count_estimate: None,
                columns: vec![column],
            }),
        }
    }

    Ok(tables)
}
