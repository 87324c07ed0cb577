//! C5 — Write Preview (spec §4.5). Builds a side-effect-free summary of a
//! write before the caller is asked to confirm it.

use oq_explain::plan_parse::parse_plan;
use oq_parser::{classify, parse_one, ParseError};
use oq_schemas::{Classification, StatementKind, WritePreview};
use oq_target::TargetConnection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("statement is not a write or dangerous operation")]
    NotWritable,
    #[error(transparent)]
    Target(#[from] oq_target::TargetError),
}

/// Build a write preview. `conn` must already be inside a transaction this
/// function is free to roll back — it always does, whether or not the row
/// estimate probe succeeds.
pub async fn build_preview(
    sql: &str,
    conn: &mut dyn TargetConnection,
    custom_phrase: Option<&str>,
) -> Result<WritePreview, PreviewError> {
    let outcome = parse_one(sql)?;
    let classification = classify(&outcome);

    if classification.classification == Classification::Read {
        return Err(PreviewError::NotWritable);
    }

    let mut warnings = Vec::new();
    let mut estimated_rows_affected = None;
    let mut explain_plan = None;

    let is_dml = matches!(
        classification.kind,
        StatementKind::Insert | StatementKind::Update | StatementKind::Delete
    );

    if is_dml {
        match conn.explain(sql).await {
            Ok(raw) => {
                let summary = parse_plan(&raw);
                estimated_rows_affected = Some(summary.estimated_rows);
                explain_plan = Some(raw);
            }
            Err(e) => {
                warnings.push(format!("could not estimate affected rows: {e}"));
            }
        }
    } else {
        warnings.push("schema-modifying statement".to_string());
    }
    conn.rollback().await?;

    let is_update_or_delete = matches!(
        classification.kind,
        StatementKind::Update | StatementKind::Delete
    );
    if is_update_or_delete && !classification.has_where_clause {
        warnings.push("affects ALL rows".to_string());
    }

    let is_dangerous = classification.classification == Classification::Dangerous;
    if is_dangerous {
        warnings.push("may cause irreversible data loss".to_string());
    }

    let confirmation_phrase =
        oq_confirm::required_write_phrase(classification.has_where_clause, custom_phrase);

    Ok(WritePreview {
        classification: classification.classification,
        kind: classification.kind,
        impacted_tables: classification.impacted_tables,
        has_where_clause: classification.has_where_clause,
        summary: classification.summary,
        estimated_rows_affected,
        explain_plan,
        warnings,
        requires_confirmation: true,
        confirmation_phrase,
        requires_dangerous_confirmation: is_dangerous,
        dangerous_confirmation_phrase: is_dangerous
            .then(|| oq_confirm::DANGEROUS_PHRASE.to_string()),
    })
}
