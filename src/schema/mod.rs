//! The schema model, validator, and diff/migration tooling (C4).

pub mod diff;
pub mod model;
pub mod validator;

pub use diff::{compare, migration_sql, ChangeKind, SchemaChange};
pub use model::{
    ArrayConstraints, Constraints, DanglingEdgeReference, Direction, EdgeLabel, EdgeRecord, GraphData, Multiplicity,
    NumberConstraints, ObjectConstraints, PropertyDefinition, Schema, SchemaVersion, StringConstraints, VertexLabel,
};
pub use validator::{validate, ValidateOptions, ValidationError, ValidationReport};
