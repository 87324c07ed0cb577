//! C8 — Orchestrator (Ask + Run). The two single entry points spec §4.8
//! calls for, composing C1–C7 and persisting query/generation/run records
//! regardless of outcome.

pub mod ask;
pub mod run;

pub use ask::{ask_and_maybe_run, AskError, AskOutcome, AskStatus, ReadExecutionResult};
pub use run::{
    confirm_and_execute_write, preview_write, run_sql, ConfirmAndExecuteError, OrchestratorError,
    RunOutcome, WriteOutcome, DEFAULT_STATEMENT_TIMEOUT,
};
