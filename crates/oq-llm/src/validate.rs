use crate::GeneratedPlan;

/// Structural validation of a generated plan. Not a parser or policy
/// check — C1/C3 own SQL semantics. This only rejects shapes an
/// orchestrator could never safely forward: blank SQL, out-of-range
/// confidence, or params with empty names.
pub fn validate_plan(plan: &GeneratedPlan) -> Result<(), String> {
    if plan.sql.trim().is_empty() {
        return Err("plan.sql is blank".to_string());
    }
    if !(0.0..=1.0).contains(&plan.confidence) {
        return Err(format!(
            "plan.confidence {} is outside [0.0, 1.0]",
            plan.confidence
        ));
    }
    for param in &plan.params {
        if param.name.trim().is_empty() {
            return Err("bind parameter has an empty name".to_string());
        }
    }
    Ok(())
}
