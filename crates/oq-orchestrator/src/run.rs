//! `run_sql`, `preview_write`, and `confirm_and_execute_write` (spec §4.8,
//! §6). Together these are the read and write halves of one state machine:
//! a read runs to completion here; a write stops at `AwaitingPreview` and
//! the caller re-enters through the latter two functions.

use oq_explain::run_guarded_read;
use oq_parser::{classify, parse_one};
use oq_policy::{validate, ModeConfig, PolicyConfig};
use oq_schemas::{
    AuditEventType, BindParam, Classification, ExplainSummary, Mode, Profile, RunStatus,
    WritePreview,
};
use oq_store::Store;
use oq_target::{DbAdapter, Row};
use std::time::Duration;
use thiserror::Error;

/// Every database session sets a session-level statement timeout independent
/// of any outer deadline (spec §5).
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] oq_store::StoreError),
    #[error(transparent)]
    Target(#[from] oq_target::TargetError),
    #[error(transparent)]
    Preview(#[from] oq_preview::PreviewError),
    #[error(transparent)]
    Explain(#[from] oq_explain::ExplainError),
}

#[derive(Debug, Error)]
pub enum ConfirmAndExecuteError {
    #[error(transparent)]
    Confirm(#[from] oq_confirm::ConfirmError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Policy denied the statement outright — rule violation, multi-statement
    /// input, unknown kind, and so on.
    Denied {
        reason: String,
        details: Option<String>,
        suggested_fix: Option<String>,
    },
    /// A read ran to completion.
    Read {
        rewritten_sql: String,
        warnings: Vec<String>,
        rows: Vec<Row>,
        truncated: bool,
        exec_ms: i64,
        explain_summary: Option<ExplainSummary>,
    },
    /// The EXPLAIN gate blocked a read before it ran; nothing was executed.
    ExplainBlocked {
        summary: Option<ExplainSummary>,
        blockers: Vec<String>,
    },
    /// Policy allowed a write or dangerous statement. Execution stops here —
    /// the caller must now call [`preview_write`] and, once the user has
    /// typed the right phrase(s), [`confirm_and_execute_write`].
    AwaitingPreview { rewritten_sql: String },
}

#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Executed { rows_affected: u64, exec_ms: i64 },
    Failed { error: String },
}

fn policy_config(mode: Mode, profile: &Profile) -> PolicyConfig {
    PolicyConfig {
        mode,
        allow_write: profile.power.allow_write,
        allow_destructive: profile.power.allow_dangerous,
    }
}

/// C8's `run_sql`: classify, validate, and — for reads — run the EXPLAIN
/// gate and execute. Persists a query record plus a run record on every
/// path (spec §4.8 step 6), and emits `write_blocked` when a non-read
/// statement is denied (spec §8).
pub async fn run_sql(
    store: &Store,
    adapter: &dyn DbAdapter,
    profile: &Profile,
    sql: &str,
    mode: Mode,
    mode_cfg: &ModeConfig,
    max_rows: usize,
) -> Result<RunOutcome, OrchestratorError> {
    let query_record = store
        .insert_query_record(profile.id, None, mode, profile.dialect)
        .await?;

    let parsed = match parse_one(sql) {
        Ok(parsed) => parsed,
        Err(e) => {
            store
                .insert_run_record(
                    query_record.id,
                    None,
                    None,
                    None,
                    None,
                    false,
                    RunStatus::Error,
                    Some(e.to_string()),
                )
                .await?;
            return Ok(RunOutcome::Denied {
                reason: e.to_string(),
                details: None,
                suggested_fix: None,
            });
        }
    };

    let classification = classify(&parsed);
    let policy = policy_config(mode, profile);
    let validation = validate(&parsed, &classification, &policy, mode_cfg);

    if !validation.allowed {
        if classification.classification != Classification::Read {
            let sql_hash = oq_audit::sql_hash(sql);
            store
                .append_audit_event(
                    AuditEventType::WriteBlocked,
                    oq_audit::payload::write_blocked(
                        profile.id,
                        classification.classification,
                        &classification.impacted_tables,
                        &sql_hash,
                        &validation.reason,
                    ),
                )
                .await?;
        }
        store
            .insert_run_record(
                query_record.id,
                None,
                None,
                None,
                None,
                false,
                RunStatus::Blocked,
                Some(validation.reason.clone()),
            )
            .await?;
        return Ok(RunOutcome::Denied {
            reason: validation.reason,
            details: validation.details,
            suggested_fix: validation.suggested_fix,
        });
    }

    let rewritten_sql = validation
        .rewritten_sql
        .clone()
        .expect("ValidationResult invariant: allowed implies rewritten_sql");

    if classification.classification != Classification::Read {
        store
            .insert_run_record(
                query_record.id,
                Some(rewritten_sql.clone()),
                None,
                None,
                None,
                false,
                RunStatus::Ok,
                None,
            )
            .await?;
        return Ok(RunOutcome::AwaitingPreview { rewritten_sql });
    }

    let guarded = run_guarded_read(
        adapter,
        &rewritten_sql,
        mode_cfg,
        max_rows,
        DEFAULT_STATEMENT_TIMEOUT,
    )
    .await?;

    if !guarded.evaluation.allowed {
        store
            .insert_run_record(
                query_record.id,
                Some(rewritten_sql),
                guarded.summary.clone(),
                None,
                None,
                false,
                RunStatus::Blocked,
                Some(guarded.evaluation.blockers.join("; ")),
            )
            .await?;
        return Ok(RunOutcome::ExplainBlocked {
            summary: guarded.summary,
            blockers: guarded.evaluation.blockers,
        });
    }

    let result = guarded
        .result
        .expect("gate evaluation allowed implies a read result");

    store
        .insert_run_record(
            query_record.id,
            Some(rewritten_sql.clone()),
            guarded.summary.clone(),
            Some(result.exec_ms),
            Some(result.rows.len() as i64),
            result.truncated,
            RunStatus::Ok,
            None,
        )
        .await?;

    Ok(RunOutcome::Read {
        rewritten_sql,
        warnings: validation.warnings,
        rows: result.rows,
        truncated: result.truncated,
        exec_ms: result.exec_ms,
        explain_summary: guarded.summary,
    })
}

/// C5 entry point: opens the read-write transaction `oq_preview::build_preview`
/// always rolls back, builds the preview, and emits `write_previewed` —
/// the first event in the program order spec §5 mandates.
pub async fn preview_write(
    store: &Store,
    adapter: &dyn DbAdapter,
    profile: &Profile,
    sql: &str,
) -> Result<WritePreview, OrchestratorError> {
    let mut conn = adapter.begin_read_write(DEFAULT_STATEMENT_TIMEOUT).await?;
    let preview = oq_preview::build_preview(sql, &mut *conn, profile.power.confirm_phrase.as_deref())
        .await?;

    let sql_hash = oq_audit::sql_hash(sql);
    store
        .append_audit_event(
            AuditEventType::WritePreviewed,
            oq_audit::payload::write_previewed(
                profile.id,
                preview.classification,
                &preview.impacted_tables,
                &sql_hash,
            ),
        )
        .await?;

    Ok(preview)
}

/// C6 + C7: verify the confirmation phrase(s) against `preview` (which must
/// be the one [`preview_write`] just returned for this exact `sql`), emit
/// `write_confirmed`, then execute and emit exactly one of `write_executed`
/// / `write_failed` (spec §4.7 steps 2-4, §8's ordering invariant).
pub async fn confirm_and_execute_write(
    store: &Store,
    adapter: &dyn DbAdapter,
    profile: &Profile,
    sql: &str,
    params: &[BindParam],
    preview: &WritePreview,
    phrase: &str,
    dangerous_phrase: Option<&str>,
) -> Result<WriteOutcome, ConfirmAndExecuteError> {
    oq_confirm::verify(
        &preview.confirmation_phrase,
        phrase,
        preview.requires_dangerous_confirmation,
        dangerous_phrase,
    )?;

    let sql_hash = oq_audit::sql_hash(sql);
    store
        .append_audit_event(
            AuditEventType::WriteConfirmed,
            oq_audit::payload::write_confirmed(
                profile.id,
                preview.classification,
                &preview.impacted_tables,
                &sql_hash,
            ),
        )
        .await
        .map_err(OrchestratorError::from)?;

    let mut conn = adapter
        .begin_read_write(DEFAULT_STATEMENT_TIMEOUT)
        .await
        .map_err(OrchestratorError::from)?;

    match oq_audit::execute_write(&mut *conn, sql, params).await {
        Ok(executed) => {
            store
                .append_audit_event(
                    AuditEventType::WriteExecuted,
                    oq_audit::payload::write_executed(
                        profile.id,
                        preview.classification,
                        &preview.impacted_tables,
                        &executed.sql_hash,
                        executed.rows_affected,
                        executed.exec_ms,
                    ),
                )
                .await
                .map_err(OrchestratorError::from)?;
            Ok(WriteOutcome::Executed {
                rows_affected: executed.rows_affected,
                exec_ms: executed.exec_ms,
            })
        }
        Err(failed) => {
            store
                .append_audit_event(
                    AuditEventType::WriteFailed,
                    oq_audit::payload::write_failed(
                        profile.id,
                        preview.classification,
                        &preview.impacted_tables,
                        &failed.sql_hash,
                        &failed.error,
                    ),
                )
                .await
                .map_err(OrchestratorError::from)?;
            Ok(WriteOutcome::Failed {
                error: failed.error,
            })
        }
    }
}
