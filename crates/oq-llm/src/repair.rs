use crate::validate::validate_plan;
use crate::{GeneratePlanRequest, GeneratedPlan, LlmError, PlanGenerator};

/// `Initial -> OutputValidated | OutputInvalid -> Repaired -> OutputValidated | HardFail`
/// (spec §9). One call, and — only if validation fails — exactly one retry.
#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    OutputValidated(GeneratedPlan),
    HardFail { first_error: String, retry_error: String },
}

#[derive(Debug, Default)]
pub struct RepairState;

impl RepairState {
    pub fn new() -> Self {
        Self
    }

    /// Runs `generator` once; on structural validation failure, asks the same
    /// generator once more (the retry is the generator's own repair prompt —
    /// this crate only enforces that it happens at most once).
    pub async fn run(
        &self,
        generator: &dyn PlanGenerator,
        request: &GeneratePlanRequest,
    ) -> Result<RepairOutcome, LlmError> {
        let first = generator.generate_plan(request).await?;
        if let Err(first_error) = validate_plan(&first) {
            let retry = generator.generate_plan(request).await?;
            return match validate_plan(&retry) {
                Ok(()) => Ok(RepairOutcome::OutputValidated(retry)),
                Err(retry_error) => Ok(RepairOutcome::HardFail {
                    first_error,
                    retry_error,
                }),
            };
        }
        Ok(RepairOutcome::OutputValidated(first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oq_schemas::{Dialect, Mode};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedGenerator {
        plans: Vec<GeneratedPlan>,
        call_count: AtomicUsize,
    }

    #[async_trait]
    impl PlanGenerator for ScriptedGenerator {
        async fn generate_plan(
            &self,
            _request: &GeneratePlanRequest,
        ) -> Result<GeneratedPlan, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.plans[idx.min(self.plans.len() - 1)].clone())
        }
    }

    fn valid_plan() -> GeneratedPlan {
        GeneratedPlan {
            sql: "SELECT 1".to_string(),
            params: vec![],
            assumptions: vec![],
            safety_notes: vec![],
            confidence: 0.9,
            referenced_entities: vec![],
        }
    }

    fn invalid_plan() -> GeneratedPlan {
        GeneratedPlan {
            sql: "".to_string(),
            ..valid_plan()
        }
    }

    fn sample_request() -> GeneratePlanRequest {
        GeneratePlanRequest {
            question: "how many users?".to_string(),
            schema_subset: serde_json::json!({}),
            dialect: Dialect::Postgres,
            mode: Mode::Standard,
            blocked_tables: vec![],
        }
    }

    #[tokio::test]
    async fn valid_first_response_skips_retry() {
        let generator = ScriptedGenerator {
            plans: vec![valid_plan()],
            call_count: AtomicUsize::new(0),
        };
        let outcome = RepairState::new()
            .run(&generator, &sample_request())
            .await
            .unwrap();
        assert!(matches!(outcome, RepairOutcome::OutputValidated(_)));
        assert_eq!(generator.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_first_response_retries_once_then_succeeds() {
        let generator = ScriptedGenerator {
            plans: vec![invalid_plan(), valid_plan()],
            call_count: AtomicUsize::new(0),
        };
        let outcome = RepairState::new()
            .run(&generator, &sample_request())
            .await
            .unwrap();
        assert!(matches!(outcome, RepairOutcome::OutputValidated(_)));
        assert_eq!(generator.call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_twice_hard_fails_without_a_third_call() {
        let generator = ScriptedGenerator {
            plans: vec![invalid_plan()],
            call_count: AtomicUsize::new(0),
        };
        let outcome = RepairState::new()
            .run(&generator, &sample_request())
            .await
            .unwrap();
        assert!(matches!(outcome, RepairOutcome::HardFail { .. }));
        assert_eq!(generator.call_count.load(Ordering::SeqCst), 2);
    }
}
