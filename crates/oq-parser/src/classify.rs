use crate::ast_walk;
use oq_schemas::{Classification, StatementClassification, StatementKind};
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Outcome of `parse_one` — mirrors the `{ok: true, ...} | {ok: false, error}`
/// contract of spec §4.1 as a Rust `Result`.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub statement_count: usize,
    pub kind: StatementKind,
    pub normalized_sql: String,
    /// `None` only for the GRANT/REVOKE prefilter path, where the parser is
    /// not trusted to cover the grammar.
    pub ast: Option<Statement>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Empty SQL statement")]
    Empty,
    #[error("{0}")]
    Syntax(String),
}

/// Strip trailing whitespace and a single trailing `;` (spec §4.1).
fn normalize(sql: &str) -> String {
    let trimmed = sql.trim_end();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end().to_string()
}

fn is_grant_or_revoke(trimmed: &str) -> bool {
    let first_word: String = trimmed
        .chars()
        .take_while(|c| c.is_alphabetic())
        .collect::<String>()
        .to_uppercase();
    first_word == "GRANT" || first_word == "REVOKE"
}

/// Parse exactly one statement's worth of input using a PostgreSQL-dialect
/// grammar, per spec §4.1. `GRANT`/`REVOKE` are prefiltered before parsing
/// because parsers commonly don't cover them.
pub fn parse_one(sql: &str) -> Result<ParseOutcome, ParseError> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if is_grant_or_revoke(trimmed) {
        return Ok(ParseOutcome {
            statement_count: 1,
            kind: StatementKind::Unknown,
            normalized_sql: normalize(sql),
            ast: None,
        });
    }

    let statements = Parser::parse_sql(&PostgreSqlDialect {}, trimmed)
        .map_err(|e| ParseError::Syntax(e.to_string()))?;

    if statements.is_empty() {
        return Err(ParseError::Empty);
    }

    let kind = kind_of(&statements[0]);

    Ok(ParseOutcome {
        statement_count: statements.len(),
        kind,
        normalized_sql: normalize(sql),
        ast: Some(statements.into_iter().next().expect("checked non-empty")),
    })
}

fn kind_of(stmt: &Statement) -> StatementKind {
    match stmt {
        Statement::Query(_) => StatementKind::Select,
        Statement::Insert(_) => StatementKind::Insert,
        Statement::Update(_) => StatementKind::Update,
        Statement::Delete(_) => StatementKind::Delete,
        Statement::CreateTable(_)
        | Statement::CreateView { .. }
        | Statement::CreateIndex(_)
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction(_)
        | Statement::CreateRole { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreateType { .. } => StatementKind::Create,
        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => StatementKind::Alter,
        Statement::Drop { .. }
        | Statement::DropFunction { .. }
        | Statement::DropProcedure { .. } => StatementKind::Drop,
        Statement::Truncate { .. } => StatementKind::Truncate,
        _ => StatementKind::Unknown,
    }
}

fn summarize(kind: StatementKind, tables: &[String]) -> String {
    let verb = match kind {
        StatementKind::Select => "read",
        StatementKind::Insert => "insert into",
        StatementKind::Update => "update",
        StatementKind::Delete => "delete from",
        StatementKind::Create => "create",
        StatementKind::Alter => "alter",
        StatementKind::Drop => "drop",
        StatementKind::Truncate => "truncate",
        StatementKind::Unknown => "run an unrecognized statement against",
    };
    if tables.is_empty() {
        format!("{verb}")
    } else {
        format!("{verb} {}", tables.join(", "))
    }
}

/// Classify a parse outcome per spec §4.1's classifier + impacted-tables +
/// WHERE-presence rules.
pub fn classify(outcome: &ParseOutcome) -> StatementClassification {
    let Some(ast) = &outcome.ast else {
        // GRANT/REVOKE prefilter path.
        return StatementClassification {
            classification: Classification::Dangerous,
            kind: StatementKind::Unknown,
            impacted_tables: Vec::new(),
            has_where_clause: true,
            summary: "run an administrative GRANT/REVOKE statement".to_string(),
        };
    };

    let tables = ast_walk::impacted_tables(ast);
    let has_where = ast_walk::has_where_clause(ast);
    let summary = summarize(outcome.kind, &tables);

    StatementClassification {
        classification: outcome.kind.classification(),
        kind: outcome.kind,
        impacted_tables: tables,
        has_where_clause: has_where,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse_one("   "), Err(ParseError::Empty)));
    }

    #[test]
    fn select_classifies_as_read() {
        let outcome = parse_one("SELECT id FROM users").unwrap();
        let c = classify(&outcome);
        assert_eq!(c.classification, Classification::Read);
        assert_eq!(c.kind, StatementKind::Select);
        assert_eq!(c.impacted_tables, vec!["users".to_string()]);
    }

    #[test]
    fn update_without_where_is_flagged() {
        let outcome = parse_one("UPDATE users SET name = 'x'").unwrap();
        let c = classify(&outcome);
        assert_eq!(c.classification, Classification::Write);
        assert!(!c.has_where_clause);
    }

    #[test]
    fn update_with_where_is_flagged() {
        let outcome = parse_one("UPDATE users SET name = 'x' WHERE id = 1").unwrap();
        let c = classify(&outcome);
        assert!(c.has_where_clause);
    }

    #[test]
    fn drop_table_is_dangerous() {
        let outcome = parse_one("DROP TABLE users").unwrap();
        let c = classify(&outcome);
        assert_eq!(c.classification, Classification::Dangerous);
        assert_eq!(c.impacted_tables, vec!["users".to_string()]);
    }

    #[test]
    fn grant_is_prefiltered_dangerous() {
        let outcome = parse_one("GRANT ALL ON users TO app").unwrap();
        assert!(outcome.ast.is_none());
        let c = classify(&outcome);
        assert_eq!(c.classification, Classification::Dangerous);
        assert_eq!(c.kind, StatementKind::Unknown);
    }

    #[test]
    fn revoke_is_prefiltered_case_insensitively() {
        let outcome = parse_one("revoke select on users from app").unwrap();
        assert!(outcome.ast.is_none());
    }

    #[test]
    fn multi_statement_input_is_reported_truthfully() {
        let outcome = parse_one("SELECT 1; SELECT 2").unwrap();
        assert_eq!(outcome.statement_count, 2);
    }

    #[test]
    fn normalized_sql_strips_trailing_semicolon_and_whitespace() {
        let outcome = parse_one("SELECT 1;   ").unwrap();
        assert_eq!(outcome.normalized_sql, "SELECT 1");
    }

    #[test]
    fn parse_failure_is_surfaced() {
        let err = parse_one("SELEC FROM").unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }
}
