//! Cypher clause text rendering for the fluent query builder (C8).
//!
//! Mirrors the teacher's `SelectQuery::compile` (`queries/builder/patterns.rs`)
//! in spirit — each piece of a query is plain text the caller supplies, and
//! this module's job is only to lay the pieces out in valid Cypher, not to
//! parse or understand them.

#[derive(Debug, Clone)]
pub enum Clause {
    Match(String),
    Where(String),
    With(String),
    Unwind { expr: String, as_var: String },
    Create(String),
    Merge(String),
    SetClause(String),
    RemoveClause(String),
    Delete(Vec<String>),
    Return(Vec<String>),
    OrderBy(String),
    Skip(i64),
    Limit(i64),
}

impl Clause {
    pub fn render(&self) -> String {
        match self {
            Clause::Match(pattern) => format!("MATCH {}", pattern),
            Clause::Where(predicate) => format!("WHERE {}", predicate),
            Clause::With(expr) => format!("WITH {}", expr),
            Clause::Unwind { expr, as_var } => format!("UNWIND {} AS {}", expr, as_var),
            Clause::Create(pattern) => format!("CREATE {}", pattern),
            Clause::Merge(pattern) => format!("MERGE {}", pattern),
            Clause::SetClause(expr) => format!("SET {}", expr),
            Clause::RemoveClause(expr) => format!("REMOVE {}", expr),
            Clause::Delete(vars) => format!("DELETE {}", vars.join(", ")),
            Clause::Return(fields) => format!("RETURN {}", fields.join(", ")),
            Clause::OrderBy(expr) => format!("ORDER BY {}", expr),
            Clause::Skip(n) => format!("SKIP {}", n),
            Clause::Limit(n) => format!("LIMIT {}", n),
        }
    }
}
