//! age_graph_client - a schema-aware client library for graph data stored
//! via Apache AGE on PostgreSQL.
//!
//! `cypher()` has no native bind parameters, so every typed value this crate
//! sends into a Cypher body travels through a small parameter bridge (see
//! [`bridge`]) instead. The rest of the crate builds on top of that: a
//! schema model and validator ([`schema`]), pure Cypher template generation
//! ([`template`]), a transaction controller ([`transaction`]), a retrying
//! executor with the single `agtype` decoder ([`executor`]), a fluent,
//! variable-checked query builder ([`query`]), single-entity CRUD helpers
//! ([`ops`]), and a validating batch loader ([`loader`]). [`Client`] ties
//! all of it together behind one entry point.

pub mod bridge;
pub mod client;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod loader;
pub mod ops;
pub mod query;
pub mod schema;
pub mod template;
pub mod transaction;
pub mod value;

pub use client::Client;
pub use config::ConnectionConfig;
pub use error::{Error, Result};
pub use query::QueryBuilder;
pub use schema::model::{EdgeLabel, GraphData, Schema, VertexLabel};
pub use value::Value;
