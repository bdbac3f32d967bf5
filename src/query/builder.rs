//! The fluent query builder (C8): a chainable API that accumulates Cypher
//! clauses and bridge parameters, validating every variable reference as it
//! goes, then executes through [`crate::executor`].
//!
//! Grounded on the teacher's `queries/builder::QueryBuilder` trait — a
//! backend-agnostic definition compiled to a script plus its parameters
//! (`queries/builder/mod.rs`, `queries/builder/params.rs`) — generalized
//! here into a single-backend, stateful builder since this crate only ever
//! targets AGE's Cypher dialect.

use crate::connection::Session;
use crate::error::{Error, Result};
use crate::executor::{self, ExecuteOptions};
use crate::query::clauses::Clause;
use crate::query::validate::{UndefinedVariableError, VariableScope};
use crate::value::Value;
use crate::{bridge, dialect};

/// Accumulates Cypher clauses and bridge parameters for one query. Each
/// clause-adding method takes the variable names it declares and the ones it
/// references, so undefined-variable mistakes are caught at build time
/// rather than surfacing from the database as an opaque Cypher error.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    clauses: Vec<Clause>,
    scope: VariableScope,
    params: Vec<(String, Value)>,
    errors: Vec<UndefinedVariableError>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn declare_all(&mut self, names: &[&str]) {
        for name in names {
            self.scope.declare(name);
        }
    }

    fn check_all(&mut self, names: &[&str]) {
        for name in names {
            if let Err(e) = self.scope.check(name) {
                self.errors.push(e);
            }
        }
    }

    pub fn match_(&mut self, pattern: impl Into<String>, declares: &[&str]) -> &mut Self {
        self.declare_all(declares);
        self.clauses.push(Clause::Match(pattern.into()));
        self
    }

    /// Tokenise `expr` and check every bare identifier it references against
    /// the current scope, recording any undefined ones. Replaces trusting a
    /// caller-supplied `uses` list, which can drift from the expression text
    /// it's meant to describe.
    fn check_expr(&mut self, expr: &str) {
        self.errors.extend(self.scope.check_expression(expr));
    }

    pub fn where_(&mut self, predicate: impl Into<String>) -> &mut Self {
        let predicate = predicate.into();
        self.check_expr(&predicate);
        self.clauses.push(Clause::Where(predicate));
        self
    }

    pub fn with(&mut self, expr: impl Into<String>, declares: &[&str]) -> &mut Self {
        let expr = expr.into();
        self.check_expr(&expr);
        self.declare_all(declares);
        self.clauses.push(Clause::With(expr));
        self
    }

    pub fn unwind(&mut self, expr: impl Into<String>, as_var: impl Into<String>) -> &mut Self {
        let expr = expr.into();
        self.check_expr(&expr);
        let as_var = as_var.into();
        self.scope.declare(&as_var);
        self.clauses.push(Clause::Unwind { expr, as_var });
        self
    }

    pub fn create(&mut self, pattern: impl Into<String>, declares: &[&str]) -> &mut Self {
        self.declare_all(declares);
        self.clauses.push(Clause::Create(pattern.into()));
        self
    }

    pub fn merge(&mut self, pattern: impl Into<String>, declares: &[&str]) -> &mut Self {
        self.declare_all(declares);
        self.clauses.push(Clause::Merge(pattern.into()));
        self
    }

    pub fn set_clause(&mut self, expr: impl Into<String>) -> &mut Self {
        let expr = expr.into();
        self.check_expr(&expr);
        self.clauses.push(Clause::SetClause(expr));
        self
    }

    pub fn remove_clause(&mut self, expr: impl Into<String>) -> &mut Self {
        let expr = expr.into();
        self.check_expr(&expr);
        self.clauses.push(Clause::RemoveClause(expr));
        self
    }

    pub fn delete(&mut self, vars: &[&str]) -> &mut Self {
        self.check_all(vars);
        self.clauses.push(Clause::Delete(vars.iter().map(|v| v.to_string()).collect()));
        self
    }

    pub fn return_(&mut self, fields: &[&str]) -> &mut Self {
        for field in fields {
            self.check_expr(field);
        }
        self.clauses.push(Clause::Return(fields.iter().map(|f| f.to_string()).collect()));
        self
    }

    pub fn order_by(&mut self, expr: impl Into<String>) -> &mut Self {
        let expr = expr.into();
        self.check_expr(&expr);
        self.clauses.push(Clause::OrderBy(expr));
        self
    }

    pub fn skip(&mut self, n: i64) -> &mut Self {
        self.clauses.push(Clause::Skip(n));
        self
    }

    pub fn limit(&mut self, n: i64) -> &mut Self {
        self.clauses.push(Clause::Limit(n));
        self
    }

    /// Bind a value into the parameter bridge under `key`, available to
    /// generated clauses as `get_age_param('key')`.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// A ready-made `get_age_param('key')` reference, for use inside a
    /// clause string (e.g. `qb.where_(format!("n.name = {}", qb.param_ref("name")?), &["n"])`).
    pub fn param_ref(&self, key: &str) -> Result<String> {
        bridge::param_reference(key)
    }

    /// Every undefined-variable error accumulated so far by tokenising each
    /// WHERE/RETURN/ORDER BY/WITH/UNWIND/SET/REMOVE expression as it was
    /// added and checking its identifiers against the scope declared by
    /// MATCH/CREATE/MERGE/UNWIND up to that point. Empty means the query
    /// built so far references only declared variables.
    pub fn validate_query(&self) -> &[UndefinedVariableError] {
        &self.errors
    }

    /// Render the accumulated clauses into a Cypher body, failing if any
    /// clause referenced an undeclared variable.
    pub fn build(&self) -> Result<String> {
        if !self.validate_query().is_empty() {
            return Err(Error::UndefinedVariable { errors: self.errors.clone() });
        }
        Ok(self.clauses.iter().map(Clause::render).collect::<Vec<_>>().join("\n"))
    }

    /// Bind this builder's parameters into the session's bridge table, build
    /// the Cypher body, and run it, decoding every returned row.
    pub fn execute(&self, session: &mut Session) -> Result<Vec<Value>> {
        let body = self.build()?;
        if !self.params.is_empty() {
            bridge::set_many(session.client(), &self.params)?;
        }
        executor::execute_cypher(session.client(), session.graph_name(), &body, &ExecuteOptions::default())
    }

    /// Like [`execute`](Self::execute), but quotes `label` and validates it
    /// is a plain identifier first — convenience for callers building simple
    /// label-scoped queries without hand-writing pattern text.
    pub fn labeled_pattern(var: &str, label: &str) -> Result<String> {
        if !dialect::is_valid_identifier(label) {
            return Err(Error::Template { message: format!("invalid label '{}'", label) });
        }
        Ok(format!("({}:{})", var, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_match_return_builds_expected_cypher() {
        let mut qb = QueryBuilder::new();
        qb.match_("(n:Person)", &["n"]).return_(&["n"]);
        assert_eq!(qb.build().unwrap(), "MATCH (n:Person)\nRETURN n");
    }

    #[test]
    fn where_clause_after_match_is_valid() {
        let mut qb = QueryBuilder::new();
        qb.match_("(n:Person)", &["n"]).where_("n.age > 18").return_(&["n"]);
        assert!(qb.build().is_ok());
    }

    #[test]
    fn undeclared_variable_reference_fails_build() {
        let mut qb = QueryBuilder::new();
        qb.where_("m.age > 18");
        let err = qb.build().unwrap_err();
        match err {
            Error::UndefinedVariable { errors } => assert_eq!(errors[0].variable, "m"),
            other => panic!("expected UndefinedVariable, got {:?}", other),
        }
    }

    /// Reproduces `match('Person','p').done().return('q.name')`: the WHERE
    /// clause's `uses` is no longer caller-supplied, so this catches a
    /// mistyped property-access reference the caller never declared.
    #[test]
    fn scenario_four_undefined_return_field_reports_exact_wording() {
        let mut qb = QueryBuilder::new();
        qb.match_("(p:Person)", &["p"]).return_(&["q.name"]);
        let err = qb.build().unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("Variable 'q' is not defined"));
        assert!(rendered.contains("Did you mean: p?"));
    }

    #[test]
    fn unwind_declares_its_bound_variable() {
        let mut qb = QueryBuilder::new();
        qb.unwind("get_vertices('rows')", "row").return_(&["row"]);
        assert!(qb.build().is_ok());
    }

    #[test]
    fn unwind_flags_undeclared_source_reference() {
        let mut qb = QueryBuilder::new();
        qb.unwind("stray", "row").return_(&["row"]);
        let err = qb.build().unwrap_err();
        match err {
            Error::UndefinedVariable { errors } => assert_eq!(errors[0].variable, "stray"),
            other => panic!("expected UndefinedVariable, got {:?}", other),
        }
    }

    #[test]
    fn set_param_does_not_affect_build_output() {
        let mut qb = QueryBuilder::new();
        qb.match_("(n:Person)", &["n"]).set_param("threshold", 5i64).return_(&["n"]);
        assert_eq!(qb.build().unwrap(), "MATCH (n:Person)\nRETURN n");
    }

    #[test]
    fn labeled_pattern_rejects_invalid_labels() {
        assert!(QueryBuilder::labeled_pattern("n", "bad label").is_err());
        assert_eq!(QueryBuilder::labeled_pattern("n", "Person").unwrap(), "(n:Person)");
    }

    #[test]
    fn skip_and_limit_render_after_return() {
        let mut qb = QueryBuilder::new();
        qb.match_("(n:Person)", &["n"]).return_(&["n"]).skip(5).limit(10);
        assert_eq!(qb.build().unwrap(), "MATCH (n:Person)\nRETURN n\nSKIP 5\nLIMIT 10");
    }

    #[test]
    fn where_clause_ignores_string_literals_and_keywords() {
        let mut qb = QueryBuilder::new();
        qb.match_("(n:Person)", &["n"]).where_("n.name = 'Alice' AND NOT n.retired").return_(&["n"]);
        assert!(qb.build().is_ok());
    }

    #[test]
    fn return_clause_ignores_builtin_function_names() {
        let mut qb = QueryBuilder::new();
        qb.match_("(n:Person)", &["n"]).with("count(n)", &["total"]).return_(&["total"]);
        assert!(qb.build().is_ok());
    }
}
