//! Shared AST walkers. Rule functions in `oq-policy` dispatch on the
//! `Statement` variant; these walkers accept a visitor callback so callers
//! don't each re-implement FROM-clause/expression traversal.

use sqlparser::ast::{
    Expr, FromTable, FunctionArguments, Select, SelectItem, SetExpr, Statement, TableFactor,
    TableWithJoins,
};

/// Tables named directly in a `TableFactor`, recursing into derived tables'
/// own FROM clauses but not their SELECT list. Only tables *referenced*
/// matter here, not nested subquery internals beyond their FROM.
fn table_factor_names(tf: &TableFactor, out: &mut Vec<String>) {
    match tf {
        TableFactor::Table { name, .. } => out.push(name.to_string()),
        TableFactor::Derived { subquery, .. } => collect_query_tables(subquery, out),
        TableFactor::TableFunction { .. } | TableFactor::Function { .. } => {}
        TableFactor::UNNEST { .. } => {}
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => collect_twj_tables(table_with_joins, out),
        TableFactor::Pivot { table, .. } => table_factor_names(&table.relation, out),
        TableFactor::Unpivot { table, .. } => table_factor_names(&table.relation, out),
        TableFactor::MatchRecognize { table, .. } => table_factor_names(&table.relation, out),
        TableFactor::JsonTable { .. } => {}
    }
}

fn collect_twj_tables(twj: &TableWithJoins, out: &mut Vec<String>) {
    table_factor_names(&twj.relation, out);
    for join in &twj.joins {
        table_factor_names(&join.relation, out);
    }
}

fn collect_select_tables(select: &Select, out: &mut Vec<String>) {
    for twj in &select.from {
        collect_twj_tables(twj, out);
    }
}

fn collect_set_expr_tables(expr: &SetExpr, out: &mut Vec<String>) {
    match expr {
        SetExpr::Select(select) => collect_select_tables(select, out),
        SetExpr::Query(query) => collect_query_tables(query, out),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr_tables(left, out);
            collect_set_expr_tables(right, out);
        }
        SetExpr::Values(_) | SetExpr::Table(_) | SetExpr::Insert(_) | SetExpr::Update(_) => {}
    }
}

fn collect_query_tables(query: &sqlparser::ast::Query, out: &mut Vec<String>) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            collect_query_tables(&cte.query, out);
        }
    }
    collect_set_expr_tables(&query.body, out);
}

/// Tables touched by a statement: SELECT/DELETE FROM-clause entries; INSERT/
/// UPDATE target table(s); DDL CREATE/ALTER/DROP/TRUNCATE target name(s).
/// Deduplicated; `[]` for statements where extraction isn't meaningful.
pub fn impacted_tables(stmt: &Statement) -> Vec<String> {
    let mut out = Vec::new();

    match stmt {
        Statement::Query(query) => collect_query_tables(query, &mut out),
        Statement::Insert(insert) => out.push(insert.table_name.to_string()),
        Statement::Update(update) => out.push(update.table.relation.to_string()),
        Statement::Delete(delete) => {
            match &delete.from {
                FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => {
                    for twj in tables {
                        collect_twj_tables(twj, &mut out);
                    }
                }
            }
            for name in &delete.tables {
                out.push(name.to_string());
            }
        }
        Statement::CreateTable(create) => out.push(create.name.to_string()),
        Statement::AlterTable { name, .. } => out.push(name.to_string()),
        Statement::Drop { names, .. } => {
            for name in names {
                out.push(name.to_string());
            }
        }
        Statement::Truncate { table_names, .. } => {
            for target in table_names {
                out.push(target.name.to_string());
            }
        }
        _ => {}
    }

    out.sort();
    out.dedup();
    out
}

/// `UPDATE`/`DELETE` WHERE-clause presence. Other kinds report `true`
/// (informational only).
pub fn has_where_clause(stmt: &Statement) -> bool {
    match stmt {
        Statement::Update(update) => update.selection.is_some(),
        Statement::Delete(delete) => delete.selection.is_some(),
        _ => true,
    }
}

fn select_item_is_star(item: &SelectItem) -> bool {
    matches!(
        item,
        SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _)
    )
}

fn select_has_star(select: &Select) -> bool {
    select.projection.iter().any(select_item_is_star)
}

fn set_expr_has_star(expr: &SetExpr) -> bool {
    match expr {
        SetExpr::Select(select) => select_has_star(select),
        SetExpr::Query(query) => query_has_star(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_has_star(left) || set_expr_has_star(right)
        }
        _ => false,
    }
}

fn query_has_star(query: &sqlparser::ast::Query) -> bool {
    set_expr_has_star(&query.body)
}

/// Direct or qualified (`t.*`) star projection anywhere in a SELECT,
/// including set operations and CTEs.
pub fn select_star(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(query) => query_has_star(query),
        _ => false,
    }
}

fn select_join_count(select: &Select) -> usize {
    select.from.iter().map(|twj| twj.joins.len()).sum()
}

/// Count of joined FROM entries in the top-level SELECT.
/// Nested/derived tables are not counted towards the outer statement's cap.
pub fn join_count(stmt: &Statement) -> usize {
    match stmt {
        Statement::Query(query) => match query.body.as_ref() {
            SetExpr::Select(select) => select_join_count(select),
            _ => 0,
        },
        _ => 0,
    }
}

/// Visit every function-call name (lower-cased) anywhere in the statement's
/// expression tree. Used by the dangerous-function deny list. Walks SELECT
/// projections, WHERE/HAVING, and VALUES of INSERT.
pub fn walk_function_names(stmt: &Statement, visit: &mut dyn FnMut(&str)) {
    match stmt {
        Statement::Query(query) => walk_query_functions(query, visit),
        Statement::Insert(insert) => {
            if let Some(source) = &insert.source {
                walk_query_functions(source, visit);
            }
        }
        Statement::Update(update) => {
            for assignment in &update.assignments {
                walk_expr_functions(&assignment.value, visit);
            }
            if let Some(selection) = &update.selection {
                walk_expr_functions(selection, visit);
            }
        }
        Statement::Delete(delete) => {
            if let Some(selection) = &delete.selection {
                walk_expr_functions(selection, visit);
            }
        }
        _ => {}
    }
}

fn walk_query_functions(query: &sqlparser::ast::Query, visit: &mut dyn FnMut(&str)) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            walk_query_functions(&cte.query, visit);
        }
    }
    walk_set_expr_functions(&query.body, visit);
}

fn walk_set_expr_functions(expr: &SetExpr, visit: &mut dyn FnMut(&str)) {
    match expr {
        SetExpr::Select(select) => walk_select_functions(select, visit),
        SetExpr::Query(query) => walk_query_functions(query, visit),
        SetExpr::SetOperation { left, right, .. } => {
            walk_set_expr_functions(left, visit);
            walk_set_expr_functions(right, visit);
        }
        _ => {}
    }
}

fn walk_select_functions(select: &Select, visit: &mut dyn FnMut(&str)) {
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                walk_expr_functions(expr, visit)
            }
            _ => {}
        }
    }
    if let Some(selection) = &select.selection {
        walk_expr_functions(selection, visit);
    }
    if let Some(having) = &select.having {
        walk_expr_functions(having, visit);
    }
}

fn walk_expr_functions(expr: &Expr, visit: &mut dyn FnMut(&str)) {
    match expr {
        Expr::Function(f) => {
            visit(&f.name.to_string().to_lowercase());
            if let FunctionArguments::List(list) = &f.args {
                for arg in &list.args {
                    if let sqlparser::ast::FunctionArg::Unnamed(
                        sqlparser::ast::FunctionArgExpr::Expr(inner),
                    )
                    | sqlparser::ast::FunctionArg::Named {
                        arg: sqlparser::ast::FunctionArgExpr::Expr(inner),
                        ..
                    } = arg
                    {
                        walk_expr_functions(inner, visit);
                    }
                }
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            walk_expr_functions(left, visit);
            walk_expr_functions(right, visit);
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) | Expr::Cast { expr, .. } => {
            walk_expr_functions(expr, visit)
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            walk_expr_functions(expr, visit);
            walk_expr_functions(low, visit);
            walk_expr_functions(high, visit);
        }
        Expr::InList { expr, list, .. } => {
            walk_expr_functions(expr, visit);
            for e in list {
                walk_expr_functions(e, visit);
            }
        }
        Expr::InSubquery { expr, subquery, .. } => {
            walk_expr_functions(expr, visit);
            walk_query_functions(subquery, visit);
        }
        Expr::Subquery(query) => walk_query_functions(query, visit),
        _ => {}
    }
}
