//! `oq` — CLI front-end over the OpenQuery guarded-execution pipeline. Thin
//! by design: every operation here is a direct call into `oq-orchestrator`,
//! `oq-store`, or `oq-target`; no policy logic lives in this crate.

mod schema_introspect;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use oq_schemas::{
    AuditEventType, Dialect, ErrorEnvelope, ExitCode, Mode, PowerUpdate, Profile, ProfileSpec,
};
use oq_store::Store;
use oq_target::postgres::PostgresAdapter;
use oq_target::DbAdapter;
use tracing::info;

const ENV_STORE_PATH: &str = "OQ_STORE_PATH";
const ENV_CONFIG_PATH: &str = "OQ_CONFIG_PATH";
const ENV_TARGET_PASSWORD: &str = "OQ_TARGET_PASSWORD";
const ENV_LLM_ENDPOINT: &str = "OQ_LLM_ENDPOINT";

#[derive(Parser)]
#[command(name = "oq")]
#[command(about = "OpenQuery guarded-execution SQL copilot CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Local store lifecycle
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Connection profile management
    Profile {
        #[command(subcommand)]
        cmd: ProfileCmd,
    },

    /// Schema snapshot capture/inspection
    Schema {
        #[command(subcommand)]
        cmd: SchemaCmd,
    },

    /// Run, preview, and confirm SQL against a profile's target database
    Run {
        #[command(subcommand)]
        cmd: RunCmd,
    },

    /// Ask a question in natural language and optionally execute the result
    Ask {
        question: String,

        #[arg(long)]
        profile: Option<String>,

        #[arg(long, default_value = "safe")]
        mode: ModeArg,

        #[arg(long)]
        execute: bool,

        #[arg(long)]
        dry_run: bool,

        #[arg(long, default_value_t = 1000)]
        max_rows: usize,
    },

    /// Ask/run history
    History {
        #[command(subcommand)]
        cmd: HistoryCmd,
    },

    /// Append-only audit log
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Run pending local-store migrations
    Migrate,
    /// Report local-store path and whether it is reachable
    Status,
}

#[derive(Subcommand)]
enum ProfileCmd {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "postgres")]
        dialect: DialectArg,
        #[arg(long)]
        host: String,
        #[arg(long, default_value_t = 5432)]
        port: u16,
        #[arg(long)]
        database: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        ssl: bool,
    },
    Delete {
        name: String,
    },
    Activate {
        name: String,
    },
    /// Update a profile's POWER flags
    Power {
        name: String,
        #[arg(long)]
        allow_write: Option<bool>,
        #[arg(long)]
        allow_dangerous: Option<bool>,
        #[arg(long)]
        confirm_phrase: Option<String>,
    },
}

#[derive(Subcommand)]
enum SchemaCmd {
    /// Introspect the target database and store a new snapshot
    Refresh {
        #[arg(long)]
        profile: Option<String>,
    },
    /// Print the most recently captured snapshot
    Show {
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
enum RunCmd {
    /// Classify, validate, and (for reads) execute one SQL statement
    Sql {
        sql: String,
        #[arg(long)]
        profile: Option<String>,
        #[arg(long, default_value = "safe")]
        mode: ModeArg,
        #[arg(long, default_value_t = 1000)]
        max_rows: usize,
    },
    /// Build a write preview without executing anything
    Preview {
        sql: String,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Confirm and execute a previously previewed write
    Confirm {
        sql: String,
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        phrase: String,
        #[arg(long)]
        dangerous_phrase: Option<String>,
    },
}

#[derive(Subcommand)]
enum HistoryCmd {
    List {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    Get {
        id: String,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Safe,
    Standard,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Safe => Mode::Safe,
            ModeArg::Standard => Mode::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum DialectArg {
    Postgres,
}

impl From<DialectArg> for Dialect {
    fn from(d: DialectArg) -> Self {
        match d {
            DialectArg::Postgres => Dialect::Postgres,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let envelope = ErrorEnvelope::new(ExitCode::RuntimeError, e.to_string());
            eprintln!("{}", serde_json::to_string_pretty(&envelope)?);
            std::process::exit(envelope.code);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn open_store() -> Result<(Store, oq_config::LoadedConfig)> {
    let overlay = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
    let loaded = oq_config::load_config(overlay.as_deref()).context("loading config")?;
    let store_path = std::env::var(ENV_STORE_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(loaded.store_settings().store_path));
    let store = Store::open(&store_path)
        .await
        .with_context(|| format!("opening local store at {}", store_path.display()))?;
    store.migrate().await.context("running local store migrations")?;
    Ok((store, loaded))
}

async fn resolve_profile(store: &Store, name: Option<&str>) -> Result<Profile> {
    match name {
        Some(name) => Ok(store.get_profile_by_name(name).await?),
        None => Ok(store.get_active_profile().await?),
    }
}

fn target_password() -> Result<String> {
    std::env::var(ENV_TARGET_PASSWORD)
        .with_context(|| format!("{ENV_TARGET_PASSWORD} must be set to connect to a target database"))
}

fn target_url(profile: &Profile, password: &str) -> String {
    let sslmode = if profile.ssl { "require" } else { "prefer" };
    format!(
        "postgres://{}:{}@{}:{}/{}?sslmode={}",
        profile.user, password, profile.host, profile.port, profile.database, sslmode
    )
}

async fn connect_adapter(profile: &Profile) -> Result<PostgresAdapter> {
    let password = target_password()?;
    let url = target_url(profile, &password);
    info!(profile = %profile.name, host = %profile.host, "connecting to target database");
    PostgresAdapter::connect(&url, 4)
        .await
        .context("connecting to target database")
}

fn build_plan_generator() -> Box<dyn oq_llm::PlanGenerator> {
    match std::env::var(ENV_LLM_ENDPOINT) {
        Ok(endpoint) => Box::new(oq_llm::HttpPlanGenerator::new(endpoint)),
        Err(_) => Box::new(oq_llm::NullPlanGenerator),
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Commands::Db { cmd } => run_db(cmd).await,
        Commands::Profile { cmd } => run_profile(cmd).await,
        Commands::Schema { cmd } => run_schema(cmd).await,
        Commands::Run { cmd } => run_run(cmd).await,
        Commands::Ask {
            question,
            profile,
            mode,
            execute,
            dry_run,
            max_rows,
        } => run_ask(question, profile, mode, execute, dry_run, max_rows).await,
        Commands::History { cmd } => run_history(cmd).await,
        Commands::Audit { cmd } => run_audit(cmd).await,
    }
}

async fn run_db(cmd: DbCmd) -> Result<()> {
    match cmd {
        DbCmd::Migrate => {
            let _store = open_store().await?;
            println!("{}", serde_json::json!({"ok": true, "migrated": true}));
        }
        DbCmd::Status => {
            let (store, _config) = open_store().await?;
            let profiles = store.list_profiles().await?;
            println!(
                "{}",
                serde_json::json!({"ok": true, "profile_count": profiles.len()})
            );
        }
    }
    Ok(())
}

async fn run_profile(cmd: ProfileCmd) -> Result<()> {
    let (store, _config) = open_store().await?;
    match cmd {
        ProfileCmd::List => {
            let profiles = store.list_profiles().await?;
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        }
        ProfileCmd::Create {
            name,
            dialect,
            host,
            port,
            database,
            user,
            ssl,
        } => {
            let profile = store
                .create_profile(ProfileSpec {
                    name,
                    dialect: dialect.into(),
                    host,
                    port,
                    database,
                    user,
                    ssl,
                })
                .await?;
            store
                .append_audit_event(
                    AuditEventType::ProfileCreated,
                    serde_json::json!({"profile_id": profile.id.to_string(), "name": profile.name}),
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        ProfileCmd::Delete { name } => {
            let profile = store.get_profile_by_name(&name).await?;
            store.delete_profile(profile.id).await?;
            store
                .append_audit_event(
                    AuditEventType::ProfileRemoved,
                    serde_json::json!({"profile_id": profile.id.to_string(), "name": profile.name}),
                )
                .await?;
            println!("{}", serde_json::json!({"ok": true}));
        }
        ProfileCmd::Activate { name } => {
            let profile = store.get_profile_by_name(&name).await?;
            store.set_active_profile(profile.id).await?;
            store
                .append_audit_event(
                    AuditEventType::ProfileActivated,
                    serde_json::json!({"profile_id": profile.id.to_string(), "name": profile.name}),
                )
                .await?;
            println!("{}", serde_json::json!({"ok": true}));
        }
        ProfileCmd::Power {
            name,
            allow_write,
            allow_dangerous,
            confirm_phrase,
        } => {
            let profile = store.get_profile_by_name(&name).await?;
            let was_enabled = profile.power.allow_write;
            let updated = store
                .update_power(
                    profile.id,
                    PowerUpdate {
                        allow_write,
                        allow_dangerous,
                        confirm_phrase: confirm_phrase.map(Some),
                    },
                )
                .await?;
            if was_enabled != updated.power.allow_write {
                let event_type = if updated.power.allow_write {
                    AuditEventType::PowerEnabled
                } else {
                    AuditEventType::PowerDisabled
                };
                store
                    .append_audit_event(
                        event_type,
                        serde_json::json!({"profile_id": updated.id.to_string(), "name": updated.name}),
                    )
                    .await?;
            }
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }
    Ok(())
}

async fn run_schema(cmd: SchemaCmd) -> Result<()> {
    let (store, _config) = open_store().await?;
    match cmd {
        SchemaCmd::Refresh { profile } => {
            let profile = resolve_profile(&store, profile.as_deref()).await?;
            let adapter = connect_adapter(&profile).await?;
            let tables = schema_introspect::capture(&adapter, Duration::from_secs(15)).await?;
            info!(table_count = tables.len(), "captured schema snapshot");
            let snapshot = store.store_schema_snapshot(profile.id, tables).await?;
            store
                .append_audit_event(
                    AuditEventType::SchemaRefreshed,
                    serde_json::json!({"profile_id": profile.id.to_string(), "table_count": snapshot.tables.len()}),
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        SchemaCmd::Show { profile } => {
            let profile = resolve_profile(&store, profile.as_deref()).await?;
            match store.latest_schema_snapshot(profile.id).await? {
                Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                None => bail!("no schema snapshot for this profile — run `oq schema refresh` first"),
            }
        }
    }
    Ok(())
}

async fn run_run(cmd: RunCmd) -> Result<()> {
    let (store, config) = open_store().await?;
    match cmd {
        RunCmd::Sql {
            sql,
            profile,
            mode,
            max_rows,
        } => {
            let profile = resolve_profile(&store, profile.as_deref()).await?;
            let adapter = connect_adapter(&profile).await?;
            let mode: Mode = mode.into();
            let mode_cfg = config.mode_config(mode);
            let outcome = oq_orchestrator::run_sql(
                &store, &adapter, &profile, &sql, mode, &mode_cfg, max_rows,
            )
            .await?;
            store
                .append_audit_event(
                    AuditEventType::QueryRan,
                    serde_json::json!({
                        "profile_id": profile.id.to_string(),
                        "sql_hash": oq_audit::sql_hash(&sql),
                        "mode": mode.as_str(),
                    }),
                )
                .await?;
            print_run_outcome(&outcome)?;
        }
        RunCmd::Preview { sql, profile } => {
            let profile = resolve_profile(&store, profile.as_deref()).await?;
            let adapter = connect_adapter(&profile).await?;
            let preview = oq_orchestrator::preview_write(&store, &adapter, &profile, &sql).await?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        RunCmd::Confirm {
            sql,
            profile,
            phrase,
            dangerous_phrase,
        } => {
            let profile = resolve_profile(&store, profile.as_deref()).await?;
            let adapter = connect_adapter(&profile).await?;
            // The preview is rebuilt here rather than cached across invocations:
            // each CLI call is a fresh process, so there is nowhere to hold it.
            let preview = oq_orchestrator::preview_write(&store, &adapter, &profile, &sql).await?;
            let outcome = oq_orchestrator::confirm_and_execute_write(
                &store,
                &adapter,
                &profile,
                &sql,
                &[],
                &preview,
                &phrase,
                dangerous_phrase.as_deref(),
            )
            .await?;
            match outcome {
                oq_orchestrator::WriteOutcome::Executed {
                    rows_affected,
                    exec_ms,
                } => println!(
                    "{}",
                    serde_json::json!({"ok": true, "rows_affected": rows_affected, "exec_ms": exec_ms})
                ),
                oq_orchestrator::WriteOutcome::Failed { error } => {
                    let envelope = ErrorEnvelope::new(ExitCode::RuntimeError, "write failed")
                        .with_details(error);
                    println!("{}", serde_json::to_string_pretty(&envelope)?);
                }
            }
        }
    }
    Ok(())
}

fn print_run_outcome(outcome: &oq_orchestrator::RunOutcome) -> Result<()> {
    use oq_orchestrator::RunOutcome;
    match outcome {
        RunOutcome::Denied {
            reason,
            details,
            suggested_fix,
        } => {
            let mut envelope = ErrorEnvelope::new(ExitCode::PolicyDenial, reason.clone());
            if let Some(details) = details {
                envelope = envelope.with_details(details.clone());
            }
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            if let Some(fix) = suggested_fix {
                eprintln!("suggested fix: {fix}");
            }
        }
        RunOutcome::Read {
            rewritten_sql,
            warnings,
            rows,
            truncated,
            exec_ms,
            explain_summary,
        } => {
            println!(
                "{}",
                serde_json::json!({
                    "ok": true,
                    "rewritten_sql": rewritten_sql,
                    "warnings": warnings,
                    "rows": rows,
                    "truncated": truncated,
                    "exec_ms": exec_ms,
                    "explain_summary": explain_summary,
                })
            );
        }
        RunOutcome::ExplainBlocked { summary, blockers } => {
            let envelope =
                ErrorEnvelope::new(ExitCode::PolicyDenial, "blocked by EXPLAIN gate")
                    .with_details(blockers.join("; "));
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            let _ = summary;
        }
        RunOutcome::AwaitingPreview { rewritten_sql } => {
            println!(
                "{}",
                serde_json::json!({
                    "ok": true,
                    "status": "awaiting_preview",
                    "rewritten_sql": rewritten_sql,
                })
            );
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_ask(
    question: String,
    profile: Option<String>,
    mode: ModeArg,
    execute: bool,
    dry_run: bool,
    max_rows: usize,
) -> Result<()> {
    let (store, config) = open_store().await?;
    let profile = resolve_profile(&store, profile.as_deref()).await?;
    let adapter = connect_adapter(&profile).await?;
    let generator = build_plan_generator();
    let mode: Mode = mode.into();
    let mode_cfg = config.mode_config(mode);

    let outcome = oq_orchestrator::ask_and_maybe_run(
        &store,
        &adapter,
        generator.as_ref(),
        &profile,
        &question,
        mode,
        &mode_cfg,
        vec![],
        execute,
        dry_run,
        max_rows,
    )
    .await?;

    store
        .append_audit_event(
            AuditEventType::QueryRan,
            serde_json::json!({
                "profile_id": profile.id.to_string(),
                "question": question,
                "mode": mode.as_str(),
            }),
        )
        .await?;

    println!(
        "{}",
        serde_json::json!({
            "status": format!("{:?}", outcome.status).to_lowercase(),
            "plan": outcome.plan,
            "rewritten_sql": outcome.rewritten_sql,
            "reason": outcome.reason,
            "warnings": outcome.warnings,
            "explain_summary": outcome.explain_summary,
            "rows": outcome.execution_result.as_ref().map(|r| &r.rows),
            "truncated": outcome.execution_result.as_ref().map(|r| r.truncated),
        })
    );
    Ok(())
}

async fn run_history(cmd: HistoryCmd) -> Result<()> {
    let (store, _config) = open_store().await?;
    match cmd {
        HistoryCmd::List { profile, limit } => {
            let profile = resolve_profile(&store, profile.as_deref()).await?;
            let history = store.list_history(profile.id, limit).await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        HistoryCmd::Get { id } => {
            let id = uuid::Uuid::parse_str(&id).context("invalid history id")?;
            let record = store.get_history(oq_schemas::QueryId::from(id)).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }
    Ok(())
}

async fn run_audit(cmd: AuditCmd) -> Result<()> {
    let (store, _config) = open_store().await?;
    match cmd {
        AuditCmd::List { limit } => {
            let events = store.list_audit(limit).await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }
    Ok(())
}
