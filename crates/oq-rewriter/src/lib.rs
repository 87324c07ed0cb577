//! C2 — Rewriter. Only reads are rewritten; `ensure_limit` injects or
//! clamps a `LIMIT` clause while preserving original text whenever no
//! change is required (spec §4.2).

use oq_parser::Statement;
use regex::Regex;
use sqlparser::ast::{Expr, Value};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub struct LimitResult {
    pub sql: String,
    pub limit_applied: bool,
    pub clamped: bool,
    pub original_limit: Option<i64>,
}

impl LimitResult {
    fn unchanged(sql: String) -> Self {
        Self {
            sql,
            limit_applied: false,
            clamped: false,
            original_limit: None,
        }
    }
}

fn limit_as_i64(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Value(Value::Number(s, _)) => s.parse().ok(),
        _ => None,
    }
}

/// `effective_limit(rewritten_sql) <= max_limit` for every rewritten SELECT
/// (spec §8 invariant). Apply or clamp the `LIMIT` clause of a single
/// SELECT statement.
pub fn ensure_limit(sql: &str, default_limit: i64, max_limit: i64) -> LimitResult {
    let statements = match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(s) if s.len() == 1 => s,
        // Multi-statement or parse error: defer to the regex fallback. The
        // policy engine rejects multi-statement input on its own rules, so
        // this branch only needs to avoid corrupting the text.
        _ => return regex_fallback(sql, default_limit),
    };

    let Statement::Query(query) = &statements[0] else {
        return LimitResult::unchanged(sql.to_string());
    };

    match query.limit {
        Some(ref limit_expr) => {
            let Some(current) = limit_as_i64(limit_expr) else {
                // Non-literal LIMIT (e.g. a bind parameter); nothing we can
                // safely clamp, leave as-is.
                return LimitResult::unchanged(sql.to_string());
            };

            if current <= max_limit {
                LimitResult::unchanged(sql.to_string())
            } else {
                let mut clamped_query = query.clone();
                clamped_query.limit = Some(Expr::Value(Value::Number(max_limit.to_string(), false)));
                let mut clamped_stmt = statements[0].clone();
                if let Statement::Query(q) = &mut clamped_stmt {
                    *q = clamped_query;
                }
                LimitResult {
                    sql: clamped_stmt.to_string(),
                    limit_applied: false,
                    clamped: true,
                    original_limit: Some(current),
                }
            }
        }
        None => {
            // No top-level LIMIT. A SELECT whose body is a set operation
            // (UNION/INTERSECT/EXCEPT) or raw VALUES still gets one appended
            // textually — re-serializing here would reformat the original,
            // which spec §4.2 step 3 explicitly avoids.
            LimitResult {
                sql: format!("{} LIMIT {default_limit}", sql.trim_end()),
                limit_applied: true,
                clamped: false,
                original_limit: None,
            }
        }
    }
}

fn limit_re() -> &'static Regex {
    static LIMIT_RE: OnceLock<Regex> = OnceLock::new();
    LIMIT_RE.get_or_init(|| Regex::new(r"(?i)\bLIMIT\s+\d+").unwrap())
}

/// Defense-in-depth fallback (spec §4.2 step 6): used only when the AST
/// rewrite path can't run. Policy still runs on the original statement.
fn regex_fallback(sql: &str, default_limit: i64) -> LimitResult {
    if limit_re().is_match(sql) {
        LimitResult::unchanged(sql.to_string())
    } else {
        LimitResult {
            sql: format!("{} LIMIT {default_limit}", sql.trim_end()),
            limit_applied: true,
            clamped: false,
            original_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_default_limit_when_absent() {
        let r = ensure_limit("SELECT id FROM users", 200, 5000);
        assert!(r.sql.ends_with(" LIMIT 200"));
        assert!(r.limit_applied);
        assert!(!r.clamped);
    }

    #[test]
    fn leaves_limit_under_max_unchanged() {
        let r = ensure_limit("SELECT id FROM users LIMIT 10", 200, 5000);
        assert_eq!(r.sql, "SELECT id FROM users LIMIT 10");
        assert!(!r.limit_applied);
        assert!(!r.clamped);
    }

    #[test]
    fn clamps_limit_over_max() {
        let r = ensure_limit("SELECT id FROM users LIMIT 10000", 200, 5000);
        assert!(r.sql.contains("5000"));
        assert!(r.clamped);
        assert_eq!(r.original_limit, Some(10000));
    }

    #[test]
    fn non_select_is_untouched() {
        let r = ensure_limit("UPDATE users SET name = 'x' WHERE id = 1", 200, 5000);
        assert_eq!(r.sql, "UPDATE users SET name = 'x' WHERE id = 1");
        assert!(!r.limit_applied);
        assert!(r.original_limit.is_none());
    }

    #[test]
    fn idempotent_on_already_clamped_sql() {
        let first = ensure_limit("SELECT id FROM users LIMIT 10000", 200, 5000);
        let second = ensure_limit(&first.sql, 200, 5000);
        assert_eq!(first.sql, second.sql);
        assert!(!second.clamped);
    }

    #[test]
    fn idempotent_on_injected_limit() {
        let first = ensure_limit("SELECT id FROM users", 200, 5000);
        let second = ensure_limit(&first.sql, 200, 5000);
        assert_eq!(first.sql, second.sql);
        assert!(!second.limit_applied);
    }

    #[test]
    fn ignores_offset_when_checking_for_existing_limit() {
        let r = ensure_limit("SELECT id FROM users OFFSET 5", 200, 5000);
        assert!(r.limit_applied);
    }
}
