use crate::{GeneratePlanRequest, GeneratedPlan, LlmError, PlanGenerator};
use async_trait::async_trait;

/// Always fails. Used for offline/test wiring where no real generator is
/// configured — `ask_and_maybe_run` should treat this as `HardFail`, not panic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlanGenerator;

#[async_trait]
impl PlanGenerator for NullPlanGenerator {
    async fn generate_plan(
        &self,
        _request: &GeneratePlanRequest,
    ) -> Result<GeneratedPlan, LlmError> {
        Err(LlmError::Unconfigured)
    }
}
