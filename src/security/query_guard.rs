//! Read-only query gate
//!
//! Candidate SQL passes three checks before it may reach the store:
//! a `select` prefix, a keyword denylist, and a structural check on the
//! parsed AST (single read-only query over allowlisted tables and
//! functions). Any failure is `ArgoError::Policy`.

use crate::error::{ArgoError, Result};
use sqlparser::ast::{Expr, ObjectName, Query, SetExpr, Statement, TableFactor, Visit, Visitor};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::collections::HashSet;
use std::ops::ControlFlow;
use tracing::warn;

/// Substrings that reject a query outright, matched case-insensitively
/// anywhere in the text (identifiers and literals included).
pub const DENYLISTED_KEYWORDS: [&str; 7] = [
    "drop", "delete", "insert", "update", "alter", "create", "truncate",
];

/// Functions a generated query may call.
pub const READ_ONLY_FUNCTIONS: &[&str] = &[
    // aggregates
    "avg", "count", "max", "min", "sum", "stddev", "stddev_pop", "stddev_samp",
    "variance", "var_pop", "var_samp", "array_agg", "string_agg", "bool_and", "bool_or",
    // numeric
    "abs", "ceil", "ceiling", "floor", "round", "trunc", "sqrt", "power", "greatest", "least",
    // dates
    "date_trunc", "date_part", "to_char", "to_date", "age",
    // text and nulls
    "lower", "upper", "length", "concat", "coalesce", "nullif",
    // windows
    "row_number", "rank", "dense_rank", "lag", "lead", "first_value", "last_value",
];

pub struct QueryGuard {
    allowed_tables: HashSet<String>,
    allowed_functions: HashSet<String>,
}

impl Default for QueryGuard {
    fn default() -> Self {
        Self::new(&["floats"], READ_ONLY_FUNCTIONS)
    }
}

impl QueryGuard {
    pub fn new(tables: &[&str], functions: &[&str]) -> Self {
        Self {
            allowed_tables: tables.iter().map(|t| t.to_lowercase()).collect(),
            allowed_functions: functions.iter().map(|f| f.to_lowercase()).collect(),
        }
    }

    /// Accept or reject a candidate statement.
    pub fn check(&self, sql: &str) -> Result<()> {
        self.validate(sql).map(|_| ())
    }

    /// Like `check`, but returns the accepted statement re-rendered from its
    /// AST: comments and the trailing terminator are gone, so the text can be
    /// embedded in a larger query.
    pub fn validate(&self, sql: &str) -> Result<String> {
        let result = check_select_prefix(sql)
            .and_then(|_| check_denylist(sql))
            .and_then(|_| self.check_structure(sql));

        if let Err(e) = &result {
            warn!(sql = %sql, reason = %e, "Query rejected by guard");
        }
        result
    }

    fn check_structure(&self, sql: &str) -> Result<String> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
            .map_err(|e| ArgoError::Policy(format!("Could not parse query: {}", e)))?;

        if statements.len() != 1 {
            return Err(ArgoError::Policy(format!(
                "Exactly one statement is allowed, found {}",
                statements.len()
            )));
        }

        let mut visitor = ReadOnlyVisitor {
            guard: self,
            scopes: Vec::new(),
        };
        match statements[0].visit(&mut visitor) {
            ControlFlow::Continue(()) => Ok(statements[0].to_string()),
            ControlFlow::Break(reason) => Err(ArgoError::Policy(reason)),
        }
    }
}

fn check_select_prefix(sql: &str) -> Result<()> {
    if !sql.trim().to_lowercase().starts_with("select") {
        return Err(ArgoError::Policy("Only SELECT queries are allowed".to_string()));
    }
    Ok(())
}

fn check_denylist(sql: &str) -> Result<()> {
    let lowered = sql.to_lowercase();
    match DENYLISTED_KEYWORDS.iter().find(|kw| lowered.contains(*kw)) {
        Some(keyword) => Err(ArgoError::Policy(format!(
            "Dangerous keyword '{}' not allowed",
            keyword
        ))),
        None => Ok(()),
    }
}

/// CTE names declared by one query.
///
/// A non-recursive CTE name becomes visible only after its body has been
/// checked, so a CTE cannot shadow the table it reads from.
struct CteScope {
    /// Body of each pending CTE, matched by address in `post_visit_query`.
    pending: Vec<(*const Query, String)>,
    visible: HashSet<String>,
}

struct ReadOnlyVisitor<'a> {
    guard: &'a QueryGuard,
    /// One entry per query currently being visited, innermost last.
    scopes: Vec<CteScope>,
}

impl ReadOnlyVisitor<'_> {
    fn check_set_expr(&self, body: &SetExpr) -> ControlFlow<String> {
        match body {
            SetExpr::Select(select) => {
                if select.into.is_some() {
                    return ControlFlow::Break("SELECT INTO is not allowed".to_string());
                }
                ControlFlow::Continue(())
            }
            SetExpr::SetOperation { left, right, .. } => {
                if let ControlFlow::Break(reason) = self.check_set_expr(left) {
                    return ControlFlow::Break(reason);
                }
                self.check_set_expr(right)
            }
            // nested queries get their own pre_visit_query
            SetExpr::Query(_) | SetExpr::Values(_) => ControlFlow::Continue(()),
            other => ControlFlow::Break(format!("Unsupported query body: {}", other)),
        }
    }

    fn is_cte_name(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.visible.contains(name))
    }
}

impl Visitor for ReadOnlyVisitor<'_> {
    type Break = String;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<String> {
        match statement {
            Statement::Query(_) => ControlFlow::Continue(()),
            _ => ControlFlow::Break("Only read-only queries are allowed".to_string()),
        }
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<String> {
        if !query.locks.is_empty() {
            return ControlFlow::Break("Row locking clauses are not allowed".to_string());
        }
        if let ControlFlow::Break(reason) = self.check_set_expr(&query.body) {
            return ControlFlow::Break(reason);
        }

        let mut scope = CteScope {
            pending: Vec::new(),
            visible: HashSet::new(),
        };
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let name = cte.alias.name.value.to_lowercase();
                if with.recursive {
                    scope.visible.insert(name);
                } else {
                    scope.pending.push((&*cte.query as *const Query, name));
                }
            }
        }
        self.scopes.push(scope);
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, query: &Query) -> ControlFlow<String> {
        self.scopes.pop();

        // A finished CTE body makes its name visible to later CTEs and the main body.
        if let Some(parent) = self.scopes.last_mut() {
            let finished = parent
                .pending
                .iter()
                .position(|(body, _)| std::ptr::eq(*body, query));
            if let Some(index) = finished {
                let (_, name) = parent.pending.remove(index);
                parent.visible.insert(name);
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<String> {
        match table_factor {
            TableFactor::Table { args: None, .. }
            | TableFactor::Derived { .. }
            | TableFactor::NestedJoin { .. } => ControlFlow::Continue(()),
            TableFactor::Table { name, args: Some(_), .. } => {
                ControlFlow::Break(format!("Table function '{}' is not allowed", name))
            }
            other => ControlFlow::Break(format!("Unsupported FROM item: {}", other)),
        }
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<String> {
        let parts: Vec<String> = relation.0.iter().map(|i| i.value.to_lowercase()).collect();
        let allowed = match parts.as_slice() {
            [table] => self.guard.allowed_tables.contains(table) || self.is_cte_name(table),
            [schema, table] => schema == "public" && self.guard.allowed_tables.contains(table),
            _ => false,
        };
        if allowed {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(format!("Table '{}' is not queryable", relation))
        }
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<String> {
        if let Expr::Function(function) = expr {
            let allowed = match function.name.0.as_slice() {
                [name] => self.guard.allowed_functions.contains(&name.value.to_lowercase()),
                _ => false,
            };
            if !allowed {
                return ControlFlow::Break(format!("Function '{}' is not allowed", function.name));
            }
        }
        ControlFlow::Continue(())
    }
}
