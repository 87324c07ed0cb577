//! DB-backed end-to-end test, skipped if OQ_TARGET_DATABASE_URL is not set.
//! Exercises the full write path against a real Postgres target and checks
//! the audit-event ordering invariant from spec §5: `previewed -> confirmed
//! -> executed`.

use oq_confirm::DEFAULT_WRITE_PHRASE;
use oq_orchestrator::{confirm_and_execute_write, preview_write, run_sql, RunOutcome};
use oq_policy::ModeConfig;
use oq_schemas::{AuditEventType, Dialect, Mode, PowerUpdate, ProfileSpec};
use oq_store::Store;
use oq_target::postgres::PostgresAdapter;
use oq_target::{DbAdapter, ENV_TARGET_DATABASE_URL};

#[tokio::test]
async fn write_confirm_execute_emits_events_in_order() -> anyhow::Result<()> {
    let url = match std::env::var(ENV_TARGET_DATABASE_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: {ENV_TARGET_DATABASE_URL} not set");
            return Ok(());
        }
    };

    let adapter = PostgresAdapter::connect(&url, 2).await?;
    {
        let mut setup = adapter
            .begin_read_write(std::time::Duration::from_secs(5))
            .await?;
        let _ = setup
            .execute("DROP TABLE IF EXISTS oq_orchestrator_scenario", &[])
            .await;
        setup
            .execute(
                "CREATE TABLE oq_orchestrator_scenario (id int primary key, name text)",
                &[],
            )
            .await?;
        setup
            .execute(
                "INSERT INTO oq_orchestrator_scenario (id, name) VALUES (1, 'a')",
                &[],
            )
            .await?;
        setup.commit().await?;
    }

    let store = Store::open_in_memory().await?;
    store.migrate().await?;
    let mut profile = store
        .create_profile(ProfileSpec {
            name: "scenario".to_string(),
            dialect: Dialect::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            database: "app".to_string(),
            user: "app".to_string(),
            ssl: false,
        })
        .await?;
    profile = store
        .update_power(
            profile.id,
            PowerUpdate {
                allow_write: Some(true),
                allow_dangerous: Some(false),
                confirm_phrase: None,
            },
        )
        .await?;

    let sql = "DELETE FROM oq_orchestrator_scenario WHERE id = 1";
    let mode_cfg = ModeConfig::safe_defaults();

    let outcome = run_sql(
        &store,
        &adapter,
        &profile,
        sql,
        Mode::Safe,
        &mode_cfg,
        1_000,
    )
    .await?;
    assert!(matches!(outcome, RunOutcome::AwaitingPreview { .. }));

    let preview = preview_write(&store, &adapter, &profile, sql).await?;
    assert_eq!(preview.confirmation_phrase, DEFAULT_WRITE_PHRASE);

    confirm_and_execute_write(
        &store,
        &adapter,
        &profile,
        sql,
        &[],
        &preview,
        DEFAULT_WRITE_PHRASE,
        None,
    )
    .await?;

    let events = store.list_audit(10).await?;
    let kinds: Vec<_> = events.iter().rev().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            AuditEventType::WritePreviewed,
            AuditEventType::WriteConfirmed,
            AuditEventType::WriteExecuted,
        ]
    );

    {
        let mut cleanup = adapter
            .begin_read_write(std::time::Duration::from_secs(5))
            .await?;
        cleanup
            .execute("DROP TABLE oq_orchestrator_scenario", &[])
            .await?;
        cleanup.commit().await?;
    }

    Ok(())
}
