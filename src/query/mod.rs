//! The fluent query builder (C8).

pub mod builder;
pub mod clauses;
pub mod validate;

pub use builder::QueryBuilder;
pub use validate::UndefinedVariableError;
