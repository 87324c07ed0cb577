//! A4 — LLM collaborator contract (spec §4.11). Only the interface is this
//! repo's concern: prompting and JSON-repair logic live outside this crate.
//! `RepairState` wraps one `PlanGenerator` call with the retry-once-on-validation-
//! failure state machine spec.md §9 calls for.

pub mod http;
pub mod null;
pub mod plan;
pub mod repair;
pub mod validate;

pub use http::HttpPlanGenerator;
pub use null::NullPlanGenerator;
pub use plan::{GeneratePlanRequest, GeneratedPlan};
pub use repair::{RepairOutcome, RepairState};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to LLM backend failed: {0}")]
    Request(String),

    #[error("LLM response was not valid JSON: {0}")]
    Decode(String),

    #[error("LLM response failed plan validation: {0}")]
    Invalid(String),

    #[error("no plan generator is configured")]
    Unconfigured,
}

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate_plan(
        &self,
        request: &GeneratePlanRequest,
    ) -> Result<GeneratedPlan, LlmError>;
}
