//! SQL parser and statement classifier.
//!
//! Parses one statement at a time with a PostgreSQL-dialect grammar (a
//! superset sufficient for current target dialects) and exposes AST walkers
//! shared with the rewriter and policy engine.

pub mod ast_walk;
pub mod classify;

pub use classify::{classify, parse_one, ParseError, ParseOutcome};
pub use sqlparser::ast::Statement;
