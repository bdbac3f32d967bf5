//! End-to-end tests against a real PostgreSQL + Apache AGE instance.
//!
//! These exercise the whole stack — connection bootstrap, schema validation,
//! batch loading, the fluent query builder, single-entity CRUD, and
//! transaction rollback — against an actual graph rather than mocked pieces.
//!
//! Run with: cargo test --features postgres-tests
//!
//! Prerequisites:
//! 1. PostgreSQL with the AGE extension installed and `CREATE EXTENSION age;`
//!    already run.
//! 2. A reachable database; defaults below match a local `postgres`
//!    superuser with no password. Override via `AGE_TEST_DATABASE_URL`.

#![cfg(feature = "postgres-tests")]

use age_graph_client::schema::model::{EdgeLabel, EdgeRecord, GraphData, PropertyDefinition, Schema, SchemaVersion, VertexLabel};
use age_graph_client::value::{PropertyType, Value};
use age_graph_client::{Client, ConnectionConfig};
use age_graph_client::loader::LoadOptions;

fn init_tracing() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
    });
}

fn test_config(graph_name: &str) -> ConnectionConfig {
    init_tracing();
    let url = std::env::var("AGE_TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost:5432/age_graph_client_test".to_string());
    ConnectionConfig { connection_string: Some(url), graph_name: graph_name.to_string(), ..ConnectionConfig::default() }
}

fn person_schema() -> Schema {
    let name_property = PropertyDefinition::new(PropertyType::String);
    Schema::new(SchemaVersion::new(1, 0, 0))
        .with_vertex(VertexLabel::new("Person").with_property("name", name_property.clone(), true))
        .with_vertex(VertexLabel::new("Company").with_property("name", name_property, true))
        .with_edge(EdgeLabel::new("WORKS_AT", "Person", "Company"))
}

#[test]
fn connect_and_bootstrap_session() {
    let client = Client::connect_with(&test_config("it_bootstrap")).expect("connect");
    let session = client.session().expect("acquire session");
    assert_eq!(session.graph_name(), "it_bootstrap");
}

#[test]
fn batch_load_then_query_round_trips() {
    let client = Client::connect_with(&test_config("it_batch_load")).expect("connect");
    let schema = person_schema();

    let mut data = GraphData::new();
    data.add_vertex("Person", [("name".to_string(), Value::from("Ada"))].into_iter().collect());
    data.add_vertex("Company", [("name".to_string(), Value::from("Analytical Engines"))].into_iter().collect());
    data.add_edge("WORKS_AT", EdgeRecord::new(Value::from("Ada"), Value::from("Analytical Engines")));

    let result = client.batch_load(&schema, &data, &LoadOptions::default()).expect("batch load");
    assert_eq!(result.vertices_loaded, 2);
    assert_eq!(result.edges_loaded, 1);
    assert!(result.errors.is_empty());

    let mut builder = client.query_builder();
    builder.match_("(p:Person)", &["p"]).return_(&["p"]);
    let mut session = client.session().expect("session");
    let rows = builder.execute(&mut session).expect("query");
    assert_eq!(rows.len(), 1);
}

#[test]
fn crud_operations_create_find_update_delete() {
    let client = Client::connect_with(&test_config("it_crud")).expect("connect");
    let mut session = client.session().expect("session");

    let created = age_graph_client::ops::create_vertex(
        &mut session,
        "Person",
        &Value::Object([("name".to_string(), Value::from("Grace"))].into_iter().collect()),
    )
    .expect("create vertex");
    assert!(created.as_object().is_some());

    let found = age_graph_client::ops::find_vertices(&mut session, "Person", "name", &Value::from("Grace"))
        .expect("find vertices");
    assert_eq!(found.len(), 1);

    let id = found[0].as_object().unwrap().get("id").cloned().unwrap_or(Value::Null);
    let updated = age_graph_client::ops::update_vertex(
        &mut session,
        "Person",
        &id,
        &Value::Object([("title".to_string(), Value::from("Admiral"))].into_iter().collect()),
    )
    .expect("update vertex");
    assert!(updated.as_object().is_some());

    age_graph_client::ops::delete_vertex(&mut session, "Person", &id).expect("delete vertex");
    let after_delete = age_graph_client::ops::find_vertices(&mut session, "Person", "name", &Value::from("Grace"))
        .expect("find after delete");
    assert!(after_delete.is_empty());
}

#[test]
fn transaction_rolls_back_on_error() {
    let client = Client::connect_with(&test_config("it_tx_rollback")).expect("connect");

    let outcome = client.age_transaction(|tx| -> age_graph_client::Result<()> {
        let graph_client = tx.client()?;
        age_graph_client::bridge::set(
            graph_client,
            "it_tx_rollback_props",
            &Value::Object([("name".to_string(), Value::from("Rolled Back"))].into_iter().collect()),
        )?;
        let body = "CREATE (n:Person) SET n = get_age_param('it_tx_rollback_props') RETURN n";
        age_graph_client::executor::execute_cypher(graph_client, "it_tx_rollback", body, &Default::default())?;
        Err(age_graph_client::Error::Unknown { message: "force rollback".to_string() })
    });
    assert!(outcome.is_err());

    let mut session = client.session().expect("session");
    let survivors =
        age_graph_client::ops::find_vertices(&mut session, "Person", "name", &Value::from("Rolled Back")).expect("find");
    assert!(survivors.is_empty());
}

#[test]
fn batch_load_rejects_data_that_violates_schema() {
    let client = Client::connect_with(&test_config("it_schema_violation")).expect("connect");
    let schema = person_schema();

    let mut data = GraphData::new();
    data.add_vertex("Person", Default::default());

    let result = client.batch_load(&schema, &data, &LoadOptions::default());
    assert!(result.is_err());
}
