use crate::config::{ModeConfig, PolicyConfig};
use crate::dangerous_functions;
use oq_parser::{ast_walk, ParseOutcome};
use oq_schemas::{Classification, StatementClassification, StatementKind, ValidationResult};
use oq_rewriter::ensure_limit;

struct Violation {
    reason: String,
    suggested_fix: Option<String>,
}

fn kind_permission_violation(
    classification: &StatementClassification,
    policy: &PolicyConfig,
) -> Option<Violation> {
    match classification.classification {
        Classification::Read => {
            if classification.kind == StatementKind::Unknown {
                Some(Violation {
                    reason: "Unrecognized statement kind".to_string(),
                    suggested_fix: None,
                })
            } else {
                None
            }
        }
        Classification::Write => {
            if policy.allow_write {
                None
            } else {
                Some(Violation {
                    reason: "Write statements require POWER mode with write access enabled"
                        .to_string(),
                    suggested_fix: Some(
                        "Enable POWER mode (allow_write) for this profile".to_string(),
                    ),
                })
            }
        }
        Classification::Dangerous => {
            if policy.allow_write && policy.allow_destructive {
                None
            } else {
                Some(Violation {
                    reason: "Dangerous statements require POWER mode with destructive operations enabled"
                        .to_string(),
                    suggested_fix: Some(
                        "Enable POWER mode destructive operations (allow_dangerous) for this profile"
                            .to_string(),
                    ),
                })
            }
        }
    }
}

/// C3 — evaluate an already-classified, already-parsed statement against
/// mode-dependent rules, in the order of spec §4.3. The first violation
/// becomes `reason`; every violation is collected into `details`.
pub fn validate(
    outcome: &ParseOutcome,
    classification: &StatementClassification,
    policy: &PolicyConfig,
    mode_cfg: &ModeConfig,
) -> ValidationResult {
    let mut violations: Vec<Violation> = Vec::new();

    // Rule 1: single statement.
    if outcome.statement_count > 1 {
        violations.push(Violation {
            reason: "Cannot execute multiple statements in a single request".to_string(),
            suggested_fix: Some("Split the input into one statement per request".to_string()),
        });
    }

    // Rule 2: kind permission.
    if let Some(v) = kind_permission_violation(classification, policy) {
        violations.push(v);
    }

    if let Some(ast) = &outcome.ast {
        // Rule 3: select-star.
        if classification.kind == StatementKind::Select
            && mode_cfg.disallow_select_star
            && ast_walk::select_star(ast)
        {
            violations.push(Violation {
                reason: "SELECT * is not allowed in this mode".to_string(),
                suggested_fix: Some(
                    "Specify the columns you need instead of SELECT *".to_string(),
                ),
            });
        }

        // Rule 4: join cap.
        if classification.kind == StatementKind::Select {
            let joins = ast_walk::join_count(ast);
            if joins > mode_cfg.max_joins {
                violations.push(Violation {
                    reason: format!(
                        "Query exceeds the maximum join count ({} > {})",
                        joins, mode_cfg.max_joins
                    ),
                    suggested_fix: Some("Reduce the number of joined tables".to_string()),
                });
            }
        }

        // Rule 5: blocked tables (doesn't require the AST; impacted_tables is
        // already derived from it).
        if !mode_cfg.blocked_tables.is_empty() {
            let blocked_lower: Vec<String> = mode_cfg
                .blocked_tables
                .iter()
                .map(|t| t.to_lowercase())
                .collect();
            let hit = classification
                .impacted_tables
                .iter()
                .find(|t| blocked_lower.contains(&t.to_lowercase()));
            if let Some(table) = hit {
                violations.push(Violation {
                    reason: format!("Table '{table}' is blocked by policy"),
                    suggested_fix: Some("Choose a different profile or table".to_string()),
                });
            }
        }

        // Rule 6: dangerous functions.
        let mut hit = None;
        ast_walk::walk_function_names(ast, &mut |name| {
            if hit.is_none() && dangerous_functions::is_dangerous(name) {
                hit = Some(name.to_string());
            }
        });
        if let Some(name) = hit {
            violations.push(Violation {
                reason: format!("Statement calls a disallowed function: {name}"),
                suggested_fix: None,
            });
        }
    }

    if !violations.is_empty() {
        let mut result = ValidationResult::deny(violations[0].reason.clone());
        if let Some(fix) = &violations[0].suggested_fix {
            result = result.with_suggested_fix(fix.clone());
        }
        if violations.len() > 1 {
            let rest: Vec<String> = violations[1..].iter().map(|v| v.reason.clone()).collect();
            result = result.with_details(rest.join("; "));
        }
        return result;
    }

    // All rules passed. Reads get the rewriter applied when enforced; writes
    // and dangerous statements pass through with the normalized text.
    if classification.kind == StatementKind::Select && mode_cfg.enforce_limit {
        let limit_result = ensure_limit(
            &outcome.normalized_sql,
            mode_cfg.default_limit,
            mode_cfg.max_limit,
        );
        let mut warnings = Vec::new();
        if limit_result.limit_applied {
            warnings.push(format!(
                "LIMIT {} was added automatically",
                mode_cfg.default_limit
            ));
        }
        if limit_result.clamped {
            warnings.push(format!(
                "LIMIT was clamped from {} to {}",
                limit_result.original_limit.unwrap_or_default(),
                mode_cfg.max_limit
            ));
        }
        ValidationResult::allow(limit_result.sql, warnings)
    } else {
        ValidationResult::allow(outcome.normalized_sql.clone(), Vec::new())
    }
}
