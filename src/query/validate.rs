//! Variable-reference validation for the fluent query builder (C8).
//!
//! The builder never silently emits a Cypher body that references a
//! variable no earlier clause declared — that's the class of mistake that
//! otherwise only surfaces as a cryptic error from the database. Grounded on
//! the teacher's general principle of surfacing mistakes as early and
//! specifically as possible (`error.rs`'s variant-per-failure-mode style),
//! generalized here with a classic edit-distance "did you mean" suggestion.

use std::collections::BTreeSet;
use std::fmt;

/// A clause referenced a variable no prior clause declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedVariableError {
    pub variable: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for UndefinedVariableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.suggestion {
            Some(s) => write!(f, "Variable '{}' is not defined. Did you mean: {}?", self.variable, s),
            None => write!(f, "Variable '{}' is not defined", self.variable),
        }
    }
}

/// Reserved words that tokenise as bare identifiers but are never variable
/// references, matched case-insensitively.
const RESERVED_KEYWORDS: &[&str] = &["NOT", "AND", "OR", "TRUE", "FALSE", "NULL"];

/// Built-in Cypher functions recognised by name alone (i.e. even if, for some
/// reason, not immediately followed by `(` in the source text). Extend this
/// table deliberately when the builder needs to accept another function —
/// see the design note on keyword/builtin tables in `SPEC_FULL.md` §9.
const BUILTIN_FUNCTIONS: &[&str] =
    &["count", "sum", "avg", "min", "max", "collect", "exists", "length", "type", "tostring"];

fn is_reserved_or_builtin(word: &str) -> bool {
    RESERVED_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
        || BUILTIN_FUNCTIONS.iter().any(|b| b.eq_ignore_ascii_case(word))
}

/// Tokenise a WHERE/RETURN/ORDER BY/WITH/SET/REMOVE expression string into
/// the bare identifiers it references, in source order. String literals
/// (`'...'`/`"..."`) are skipped entirely; a dotted property access like
/// `q.name` yields only the base identifier `q`; a word immediately followed
/// by `(` is a function call name, not a variable, and is dropped.
///
/// This is deliberately a tokeniser, not a parser — the builder has no
/// Cypher grammar, so it can only recognise identifier shapes and filter
/// against the closed keyword/builtin tables above.
pub fn extract_identifiers(expr: &str) -> Vec<String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            while i < chars.len() && chars[i] != quote {
                i += 1;
            }
            if i < chars.len() {
                i += 1;
            }
            continue;
        }

        if c.is_ascii_digit() {
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.' || chars[i] == '_') {
                i += 1;
            }
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();

            let mut peek = i;
            while peek < chars.len() && chars[peek].is_whitespace() {
                peek += 1;
            }
            let is_call = peek < chars.len() && chars[peek] == '(';

            if !is_call {
                out.push(word);
            }

            // Skip a dotted property-access suffix (`q.name` -> base `q`);
            // the property name itself is never a variable reference.
            if i < chars.len() && chars[i] == '.' {
                i += 1;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
            }
            continue;
        }

        i += 1;
    }

    out
}

/// Tracks which variable names have been declared so far in a query being
/// built, in declaration order of calls (not of Cypher's own clause order).
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    known: BTreeSet<String>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str) {
        self.known.insert(name.to_string());
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Check one variable reference, returning an error (with a suggestion
    /// if a declared name is close enough) if it hasn't been declared.
    pub fn check(&self, name: &str) -> Result<(), UndefinedVariableError> {
        if self.is_known(name) {
            return Ok(());
        }
        Err(UndefinedVariableError { variable: name.to_string(), suggestion: self.closest_match(name) })
    }

    /// Tokenise `expr` via [`extract_identifiers`] and check every distinct
    /// identifier it references against this scope. This is what backs the
    /// builder's pre-execution validation (C8): callers no longer declare
    /// the variables an expression uses themselves, since a caller-supplied
    /// list can drift from the expression text it annotates.
    pub fn check_expression(&self, expr: &str) -> Vec<UndefinedVariableError> {
        let mut seen = BTreeSet::new();
        let mut errors = Vec::new();
        for word in extract_identifiers(expr) {
            if is_reserved_or_builtin(&word) || !seen.insert(word.clone()) {
                continue;
            }
            if let Err(e) = self.check(&word) {
                errors.push(e);
            }
        }
        errors
    }

    /// The known variable name closest to `name` by edit distance, if any
    /// are within a small absolute threshold.
    fn closest_match(&self, name: &str) -> Option<String> {
        self.known
            .iter()
            .map(|candidate| (candidate, levenshtein(name, candidate)))
            .filter(|(_, distance)| *distance <= 2)
            .min_by_key(|(_, distance)| *distance)
            .map(|(candidate, _)| candidate.clone())
    }
}

/// Classic Wagner-Fischer edit distance between two strings, operating on
/// `char`s rather than bytes so non-ASCII identifiers compare correctly.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());

    let mut row: Vec<usize> = (0..=m).collect();
    for i in 1..=n {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=m {
            let temp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag
            } else {
                1 + row[j].min(row[j - 1]).min(prev_diag)
            };
            prev_diag = temp;
        }
    }
    row[m]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn levenshtein_identical_strings_is_zero() {
        assert_eq!(levenshtein("person", "person"), 0);
    }

    #[rstest]
    #[case("person", "persom", 1)]
    #[case("person", "persons", 1)]
    #[case("person", "erson", 1)]
    #[case("person", "company", 6)]
    fn levenshtein_counts_edits(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(levenshtein(a, b), expected);
    }

    #[test]
    fn scope_accepts_declared_variables() {
        let mut scope = VariableScope::new();
        scope.declare("n");
        assert!(scope.check("n").is_ok());
    }

    #[test]
    fn scope_rejects_unknown_variables() {
        let scope = VariableScope::new();
        let err = scope.check("n").unwrap_err();
        assert_eq!(err.variable, "n");
        assert_eq!(err.suggestion, None);
    }

    #[test]
    fn scope_suggests_close_match() {
        let mut scope = VariableScope::new();
        scope.declare("person");
        let err = scope.check("persom").unwrap_err();
        assert_eq!(err.suggestion, Some("person".to_string()));
    }

    #[test]
    fn scope_does_not_suggest_distant_names() {
        let mut scope = VariableScope::new();
        scope.declare("company");
        let err = scope.check("xyz").unwrap_err();
        assert_eq!(err.suggestion, None);
    }

    #[test]
    fn scope_suggests_even_for_short_names() {
        // Scenario 4 (`match('Person','p').done().return('q.name')`) needs a
        // single-character variable to suggest another single-character one,
        // so there is no length cutoff on the queried name itself.
        let mut scope = VariableScope::new();
        scope.declare("p");
        let err = scope.check("q").unwrap_err();
        assert_eq!(err.suggestion, Some("p".to_string()));
    }

    #[test]
    fn display_matches_exact_wording_without_suggestion() {
        let err = UndefinedVariableError { variable: "q".to_string(), suggestion: None };
        assert_eq!(err.to_string(), "Variable 'q' is not defined");
    }

    #[test]
    fn display_matches_exact_wording_with_suggestion() {
        let err = UndefinedVariableError { variable: "q".to_string(), suggestion: Some("p".to_string()) };
        let rendered = err.to_string();
        assert!(rendered.contains("Variable 'q' is not defined"));
        assert!(rendered.contains("Did you mean: p?"));
    }

    #[test]
    fn extract_identifiers_skips_string_literals() {
        let ids = extract_identifiers("n.name = 'Alice'");
        assert_eq!(ids, vec!["n".to_string()]);
    }

    #[test]
    fn extract_identifiers_takes_base_of_dotted_access() {
        let ids = extract_identifiers("q.name");
        assert_eq!(ids, vec!["q".to_string()]);
    }

    #[test]
    fn extract_identifiers_skips_function_call_names() {
        let ids = extract_identifiers("count(n) > 1 AND n.age > 18");
        assert_eq!(ids, vec!["n".to_string(), "AND".to_string(), "n".to_string()]);
    }

    #[test]
    fn extract_identifiers_handles_multiple_variables() {
        let ids = extract_identifiers("n.age > m.age");
        assert_eq!(ids, vec!["n".to_string(), "m".to_string()]);
    }

    #[test]
    fn check_expression_filters_keywords_and_builtins() {
        let mut scope = VariableScope::new();
        scope.declare("n");
        assert!(scope.check_expression("n.age > 18 AND NOT n.retired").is_empty());
        assert!(scope.check_expression("count(n) > 0").is_empty());
    }

    #[test]
    fn check_expression_reports_scenario_four() {
        let mut scope = VariableScope::new();
        scope.declare("p");
        let errors = scope.check_expression("q.name");
        assert_eq!(errors.len(), 1);
        let rendered = errors[0].to_string();
        assert!(rendered.contains("Variable 'q' is not defined"));
        assert!(rendered.contains("Did you mean: p?"));
    }

    #[test]
    fn check_expression_deduplicates_repeated_references() {
        let scope = VariableScope::new();
        let errors = scope.check_expression("m.age > 18 AND m.age < 65");
        assert_eq!(errors.len(), 1);
    }
}
