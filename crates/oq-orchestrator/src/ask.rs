//! `ask_and_maybe_run` (spec §4.8). Takes a natural-language question through
//! the LLM collaborator and then the same validate/explain path `run_sql`
//! uses for raw SQL — the generated statement is never trusted more than
//! anything a human typed in.

use oq_explain::run_guarded_read;
use oq_llm::{GeneratePlanRequest, GeneratedPlan, PlanGenerator, RepairOutcome, RepairState};
use oq_parser::{classify, parse_one};
use oq_policy::{validate, ModeConfig, PolicyConfig};
use oq_schemas::{Classification, ExplainSummary, Mode, Profile, RunStatus};
use oq_store::Store;
use oq_target::{DbAdapter, Row};
use std::time::Duration;
use thiserror::Error;

use crate::run::DEFAULT_STATEMENT_TIMEOUT;

#[derive(Debug, Error)]
pub enum AskError {
    #[error("no schema snapshot for this profile — refresh first")]
    NoSchemaSnapshot,
    #[error(transparent)]
    Store(#[from] oq_store::StoreError),
    #[error(transparent)]
    Llm(#[from] oq_llm::LlmError),
    #[error(transparent)]
    Target(#[from] oq_target::TargetError),
    #[error(transparent)]
    Explain(#[from] oq_explain::ExplainError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskStatus {
    Ok,
    Blocked,
    Error,
    DryRun,
}

#[derive(Debug, Clone)]
pub struct ReadExecutionResult {
    pub rows: Vec<Row>,
    pub truncated: bool,
    pub exec_ms: i64,
}

#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub status: AskStatus,
    pub plan: GeneratedPlan,
    pub rewritten_sql: Option<String>,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
    pub explain_summary: Option<ExplainSummary>,
    pub execution_result: Option<ReadExecutionResult>,
}

fn policy_config(mode: Mode, profile: &Profile) -> PolicyConfig {
    PolicyConfig {
        mode,
        allow_write: profile.power.allow_write,
        allow_destructive: profile.power.allow_dangerous,
    }
}

/// Ask a question, generate a candidate statement, validate it, and — for
/// reads, when the caller actually wants execution — run it. Generated
/// writes always stop short of execution: they must go through
/// `preview_write`/`confirm_and_execute_write` like any other write.
#[allow(clippy::too_many_arguments)]
pub async fn ask_and_maybe_run(
    store: &Store,
    adapter: &dyn DbAdapter,
    generator: &dyn PlanGenerator,
    profile: &Profile,
    question: &str,
    mode: Mode,
    mode_cfg: &ModeConfig,
    blocked_tables: Vec<String>,
    execute: bool,
    dry_run: bool,
    max_rows: usize,
) -> Result<AskOutcome, AskError> {
    let snapshot = store
        .latest_schema_snapshot(profile.id)
        .await?
        .ok_or(AskError::NoSchemaSnapshot)?;

    let query_record = store
        .insert_query_record(
            profile.id,
            Some(question.to_string()),
            mode,
            profile.dialect,
        )
        .await?;

    let request = GeneratePlanRequest {
        question: question.to_string(),
        schema_subset: serde_json::to_value(&snapshot.tables).unwrap_or(serde_json::Value::Null),
        dialect: profile.dialect,
        mode,
        blocked_tables,
    };

    let repair_outcome = RepairState::new().run(generator, &request).await?;

    let plan = match repair_outcome {
        RepairOutcome::OutputValidated(plan) => plan,
        RepairOutcome::HardFail {
            first_error,
            retry_error,
        } => {
            let reason = format!(
                "LLM plan failed validation twice: first={first_error}, retry={retry_error}"
            );
            store
                .insert_run_record(
                    query_record.id,
                    None,
                    None,
                    None,
                    None,
                    false,
                    RunStatus::Error,
                    Some(reason.clone()),
                )
                .await?;
            return Ok(AskOutcome {
                status: AskStatus::Error,
                plan: GeneratedPlan {
                    sql: String::new(),
                    params: vec![],
                    assumptions: vec![],
                    safety_notes: vec![],
                    confidence: 0.0,
                    referenced_entities: vec![],
                },
                rewritten_sql: None,
                reason: Some(reason),
                warnings: vec![],
                explain_summary: None,
                execution_result: None,
            });
        }
    };

    store
        .insert_generation_record(
            query_record.id,
            plan.sql.clone(),
            plan.params.clone(),
            plan.confidence,
            plan.assumptions.clone(),
            plan.safety_notes.clone(),
        )
        .await?;

    let parsed = match parse_one(&plan.sql) {
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
            return Ok(AskOutcome {
                status: AskStatus::Error,
                plan,
                rewritten_sql: None,
                reason: Some(e.to_string()),
                warnings: vec![],
                explain_summary: None,
                execution_result: None,
            });
        }
    };

    let classification = classify(&parsed);
    let policy = policy_config(mode, profile);
    let validation = validate(&parsed, &classification, &policy, mode_cfg);

    if !validation.allowed {
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
        return Ok(AskOutcome {
            status: AskStatus::Blocked,
            plan,
            rewritten_sql: None,
            reason: Some(validation.reason),
            warnings: validation.warnings,
            explain_summary: None,
            execution_result: None,
        });
    }

    let rewritten_sql = validation
        .rewritten_sql
        .clone()
        .expect("ValidationResult invariant: allowed implies rewritten_sql");

    // Generated writes never execute through this path, no matter what the
    // caller asked for: they still need a human-confirmed preview (spec §4.8
    // step 6).
    let is_read = classification.classification == Classification::Read;
    if dry_run || !execute || !is_read {
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
        return Ok(AskOutcome {
            status: AskStatus::DryRun,
            plan,
            rewritten_sql: Some(rewritten_sql),
            reason: None,
            warnings: validation.warnings,
            explain_summary: None,
            execution_result: None,
        });
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
                Some(rewritten_sql.clone()),
                guarded.summary.clone(),
                None,
                None,
                false,
                RunStatus::Blocked,
                Some(guarded.evaluation.blockers.join("; ")),
            )
            .await?;
        return Ok(AskOutcome {
            status: AskStatus::Blocked,
            plan,
            rewritten_sql: Some(rewritten_sql),
            reason: Some(guarded.evaluation.blockers.join("; ")),
            warnings: validation.warnings,
            explain_summary: guarded.summary,
            execution_result: None,
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

    Ok(AskOutcome {
        status: AskStatus::Ok,
        plan,
        rewritten_sql: Some(rewritten_sql),
        reason: None,
        warnings: validation.warnings,
        explain_summary: guarded.summary,
        execution_result: Some(ReadExecutionResult {
            rows: result.rows,
            truncated: result.truncated,
            exec_ms: result.exec_ms,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oq_schemas::{ColumnInfo, Dialect, PowerFlags, ProfileSpec, TableInfo};
    use oq_target::{ExecResult, QueryResult, TargetError};
    use serde_json::json;

    struct FakeConn {
        explain_result: Result<serde_json::Value, String>,
        query_result: Result<QueryResult, String>,
    }

    #[async_trait]
    impl oq_target::TargetConnection for FakeConn {
        async fn explain(&mut self, _sql: &str) -> Result<serde_json::Value, TargetError> {
            self.explain_result.clone().map_err(TargetError::Query)
        }

        async fn query(&mut self, _sql: &str, _max_rows: usize) -> Result<QueryResult, TargetError> {
            self.query_result
                .as_ref()
                .map(|r| r.clone())
                .map_err(|e| TargetError::Query(e.clone()))
        }

        async fn execute(
            &mut self,
            _sql: &str,
            _params: &[oq_schemas::BindParam],
        ) -> Result<ExecResult, TargetError> {
            unreachable!("ask never executes writes")
        }

        async fn rollback(&mut self) -> Result<(), TargetError> {
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), TargetError> {
            Ok(())
        }
    }

    struct FakeAdapter {
        explain_result: Result<serde_json::Value, String>,
        query_result: Result<QueryResult, String>,
    }

    #[async_trait]
    impl DbAdapter for FakeAdapter {
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        async fn begin_read_only(
            &self,
            _statement_timeout: Duration,
        ) -> Result<Box<dyn oq_target::TargetConnection>, TargetError> {
            Ok(Box::new(FakeConn {
                explain_result: self.explain_result.clone(),
                query_result: self.query_result.as_ref().map(|r| r.clone()).map_err(|e| e.clone()),
            }))
        }

        async fn begin_read_write(
            &self,
            _statement_timeout: Duration,
        ) -> Result<Box<dyn oq_target::TargetConnection>, TargetError> {
            unreachable!("ask never opens a read-write transaction")
        }
    }

    struct ScriptedGenerator {
        sql: String,
    }

    #[async_trait]
    impl PlanGenerator for ScriptedGenerator {
        async fn generate_plan(
            &self,
            _request: &GeneratePlanRequest,
        ) -> Result<GeneratedPlan, oq_llm::LlmError> {
            Ok(GeneratedPlan {
                sql: self.sql.clone(),
                params: vec![],
                assumptions: vec!["assumed users.id is the primary key".to_string()],
                safety_notes: vec![],
                confidence: 0.85,
                referenced_entities: vec!["users".to_string()],
            })
        }
    }

    fn plan_with_rows(rows: i64) -> serde_json::Value {
        json!([{"Plan": {"Node Type": "Seq Scan", "Total Cost": 1.0, "Plan Rows": rows}}])
    }

    async fn store_with_profile_and_snapshot() -> (Store, Profile) {
        let store = Store::open_in_memory().await.unwrap();
        store.migrate().await.unwrap();
        let profile = store
            .create_profile(ProfileSpec {
                name: "local".to_string(),
                dialect: Dialect::Postgres,
                host: "localhost".to_string(),
                port: 5432,
                database: "app".to_string(),
                user: "app".to_string(),
                ssl: false,
            })
            .await
            .unwrap();
        store
            .store_schema_snapshot(
                profile.id,
                vec![TableInfo {
                    schema: Some("public".to_string()),
                    name: "users".to_string(),
                    row_count_estimate: Some(10),
                    columns: vec![ColumnInfo {
                        name: "id".to_string(),
                        data_type: "uuid".to_string(),
                        nullable: false,
                        is_primary_key: true,
                        default: None,
                    }],
                }],
            )
            .await
            .unwrap();
        (store, profile)
    }

    #[tokio::test]
    async fn missing_snapshot_errors_before_calling_the_llm() {
        let store = Store::open_in_memory().await.unwrap();
        store.migrate().await.unwrap();
        let profile = store
            .create_profile(ProfileSpec {
                name: "local".to_string(),
                dialect: Dialect::Postgres,
                host: "localhost".to_string(),
                port: 5432,
                database: "app".to_string(),
                user: "app".to_string(),
                ssl: false,
            })
            .await
            .unwrap();
        let adapter = FakeAdapter {
            explain_result: Ok(plan_with_rows(1)),
            query_result: Ok(QueryResult {
                rows: vec![],
                truncated: false,
                exec_ms: 1,
            }),
        };
        let generator = ScriptedGenerator {
            sql: "SELECT id FROM users".to_string(),
        };

        let err = ask_and_maybe_run(
            &store,
            &adapter,
            &generator,
            &profile,
            "how many users?",
            Mode::Safe,
            &ModeConfig::safe_defaults(),
            vec![],
            true,
            false,
            1_000,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AskError::NoSchemaSnapshot));
    }

    #[tokio::test]
    async fn dry_run_never_touches_the_target() {
        let (store, profile) = store_with_profile_and_snapshot().await;
        let adapter = FakeAdapter {
            explain_result: Ok(plan_with_rows(1)),
            query_result: Ok(QueryResult {
                rows: vec![],
                truncated: false,
                exec_ms: 1,
            }),
        };
        let generator = ScriptedGenerator {
            sql: "SELECT id FROM users".to_string(),
        };

        let outcome = ask_and_maybe_run(
            &store,
            &adapter,
            &generator,
            &profile,
            "how many users?",
            Mode::Safe,
            &ModeConfig::safe_defaults(),
            vec![],
            true,
            true,
            1_000,
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, AskStatus::DryRun);
        assert!(outcome.rewritten_sql.unwrap().ends_with("LIMIT 200"));
        assert!(outcome.execution_result.is_none());
    }

    #[tokio::test]
    async fn read_with_execute_runs_to_completion() {
        let (store, profile) = store_with_profile_and_snapshot().await;
        let adapter = FakeAdapter {
            explain_result: Ok(plan_with_rows(1)),
            query_result: Ok(QueryResult {
                rows: vec![json!({"id": 1}).as_object().unwrap().clone()],
                truncated: false,
                exec_ms: 3,
            }),
        };
        let generator = ScriptedGenerator {
            sql: "SELECT id FROM users".to_string(),
        };

        let outcome = ask_and_maybe_run(
            &store,
            &adapter,
            &generator,
            &profile,
            "how many users?",
            Mode::Safe,
            &ModeConfig::safe_defaults(),
            vec![],
            true,
            false,
            1_000,
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, AskStatus::Ok);
        assert_eq!(outcome.execution_result.unwrap().rows.len(), 1);
    }

    #[tokio::test]
    async fn generated_write_never_executes_even_if_caller_asks() {
        let (store, mut profile) = store_with_profile_and_snapshot().await;
        profile.power = PowerFlags {
            allow_write: true,
            allow_dangerous: false,
            confirm_phrase: None,
        };
        let adapter = FakeAdapter {
            explain_result: Ok(plan_with_rows(1)),
            query_result: Ok(QueryResult {
                rows: vec![],
                truncated: false,
                exec_ms: 1,
            }),
        };
        let generator = ScriptedGenerator {
            sql: "DELETE FROM users WHERE id = 1".to_string(),
        };

        let outcome = ask_and_maybe_run(
            &store,
            &adapter,
            &generator,
            &profile,
            "remove user 1",
            Mode::Safe,
            &ModeConfig::safe_defaults(),
            vec![],
            true,
            false,
            1_000,
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, AskStatus::DryRun);
        assert!(outcome.execution_result.is_none());
    }

    #[tokio::test]
    async fn denied_statement_is_blocked_without_an_explain_call() {
        let (store, profile) = store_with_profile_and_snapshot().await;
        let adapter = FakeAdapter {
            explain_result: Ok(plan_with_rows(1)),
            query_result: Ok(QueryResult {
                rows: vec![],
                truncated: false,
                exec_ms: 1,
            }),
        };
        let generator = ScriptedGenerator {
            sql: "SELECT * FROM users".to_string(),
        };

        let outcome = ask_and_maybe_run(
            &store,
            &adapter,
            &generator,
            &profile,
            "show me everything",
            Mode::Safe,
            &ModeConfig::safe_defaults(),
            vec![],
            true,
            false,
            1_000,
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, AskStatus::Blocked);
        assert!(outcome.reason.unwrap().contains("SELECT *"));
    }
}
