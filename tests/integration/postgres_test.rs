//! Full pipeline against a PostgreSQL store.
//!
//! Requires a running PostgreSQL database; set DATABASE_URL to run them.

use std::sync::Arc;

use glue_ask::app::AppContext;
use glue_ask::catalog::{CatalogIndex, StaticCatalog};
use glue_ask::config::ConnectionConfig;
use glue_ask::db::{DatabaseClient, PostgresClient};
use glue_ask::handler::ApiRequest;
use glue_ask::llm::MockLlmClient;
use glue_ask::pipeline::{RoutingMode, StoreRegistry};

async fn get_test_client() -> Option<PostgresClient> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    PostgresClient::connect(&config).await.ok()
}

#[tokio::test]
async fn test_pipeline_answers_from_postgres() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let store = Arc::new(client);
    let llm = Arc::new(
        MockLlmClient::new()
            .then_return("database == sales")
            .then_return(" SELECT 2::int4 + 1"),
    );

    let context = AppContext::from_parts(
        CatalogIndex::new(Arc::new(StaticCatalog::sample()), "sales"),
        StoreRegistry::new(store.clone()),
        llm.clone(),
        RoutingMode::Static,
    );

    let response = context
        .handler()
        .handle(ApiRequest::for_question("What is two plus one?"))
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "\"The query returned [(3,)].\"");
    assert!(llm.prompts()[1].contains("postgresql query"));

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_pipeline_retries_postgres_error() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let store = Arc::new(client);
    let llm = Arc::new(
        MockLlmClient::new()
            .then_return("database == sales")
            .then_return(" SELECT * FROM nonexistent_table_xyz")
            .then_return("database == sales")
            .then_return(" SELECT 1::int4"),
    );

    let context = AppContext::from_parts(
        CatalogIndex::new(Arc::new(StaticCatalog::sample()), "sales"),
        StoreRegistry::new(store.clone()),
        llm.clone(),
        RoutingMode::Static,
    );

    let response = context
        .handler()
        .handle(ApiRequest::for_question("Count the rows"))
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "\"The query returned [(1,)].\"");
    assert!(llm.prompts()[2].contains("previous exception"));
    assert!(llm.prompts()[2].contains("nonexistent_table_xyz"));

    store.close().await.unwrap();
}
