//! End-to-end pipeline tests over in-memory doubles.
//!
//! Covers catalog rendering, the first-attempt flow and the single retry.

use glue_ask::catalog::{CatalogIndex, CatalogTable, StaticCatalog};
use glue_ask::db::{ColumnInfo, MockDatabaseClient, QueryResult, Value};
use glue_ask::handler::ApiRequest;
use glue_ask::llm::MockLlmClient;
use glue_ask::pipeline::RETRY_SUFFIX;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use super::common::Harness;

fn count_result(count: i64) -> QueryResult {
    QueryResult::with_data(
        vec![ColumnInfo::new("_col0", "bigint")],
        vec![vec![Value::Int(count)]],
    )
}

#[tokio::test]
async fn test_catalog_renders_one_line_per_column() {
    let catalog = StaticCatalog::new(vec![
        CatalogTable::new("sales", "orders")
            .with_location("s3://lake/orders/")
            .with_columns(["order_id", "amount"]),
        CatalogTable::new("sales", "regions")
            .with_location("hdfs://warehouse/regions")
            .with_parameter("classification", "csv")
            .with_columns(["region"]),
    ]);
    let index = CatalogIndex::new(Arc::new(catalog), "sales");

    let rendered = index.fetch_rendered().await.unwrap();

    assert_eq!(
        rendered,
        "\ns3|sales|orders|order_id\ns3|sales|orders|amount\ncsv|sales|regions|region"
    );
}

#[tokio::test]
async fn test_first_attempt_success() {
    let harness = Harness::new(
        MockDatabaseClient::sample().then_return(count_result(3)),
        MockLlmClient::new(),
    );

    let response = harness
        .context
        .handler()
        .handle(ApiRequest::for_question("How many orders are there?"))
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "\"The query returned [(3,)].\"");

    assert_eq!(harness.catalog.call_count(), 1);
    assert_eq!(harness.llm.routing_calls(), 1);
    assert_eq!(harness.llm.call_count(), 3);
    assert_eq!(
        harness.store.executed(),
        vec!["SELECT COUNT(*) FROM \"orders\"".to_string()]
    );
}

#[tokio::test]
async fn test_routing_prompt_lists_catalog() {
    let harness = Harness::sample();

    harness
        .context
        .handler()
        .handle(ApiRequest::for_question("Which customers are in France?"))
        .await;

    let routing_prompt = &harness.llm.prompts()[0];
    assert!(routing_prompt.contains("the question Which customers are in France?"));
    assert!(routing_prompt.contains("\ns3|sales|customers|country"));
    assert!(routing_prompt.ends_with("Also, give your answer as database.table == "));
}

#[tokio::test]
async fn test_retry_after_store_failure() {
    let failure = "COLUMN_NOT_FOUND: line 1:8: Column 'total' cannot be resolved";
    let harness = Harness::new(
        MockDatabaseClient::sample()
            .then_fail(failure)
            .then_return(count_result(3)),
        MockLlmClient::new(),
    );

    let response = harness
        .context
        .handler()
        .handle(ApiRequest::for_question("How many orders are there?"))
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "\"The query returned [(3,)].\"");

    // Routing and SQL on the first attempt, then routing, SQL and summary.
    let prompts = harness.llm.prompts();
    assert_eq!(prompts.len(), 5);
    let retry_question = format!("How many orders are there?{RETRY_SUFFIX}{failure}");
    assert!(prompts[2].contains(&retry_question));
    assert!(prompts[3].contains(&format!("Question: {retry_question}\nSQLQuery:")));

    assert_eq!(harness.catalog.call_count(), 2);
    assert_eq!(harness.store.execution_count(), 2);
}

#[tokio::test]
async fn test_retry_failure_becomes_server_error() {
    let harness = Harness::new(
        MockDatabaseClient::sample()
            .then_fail("TABLE_NOT_FOUND: orders")
            .then_fail("TABLE_NOT_FOUND: orders again"),
        MockLlmClient::new(),
    );

    let response = harness
        .context
        .handler()
        .handle(ApiRequest::for_question("How many orders are there?"))
        .await;

    assert_eq!(response.status_code, 500);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["message"], "Query error: TABLE_NOT_FOUND: orders again");
    assert_eq!(body["kind"], "query");

    assert_eq!(harness.store.execution_count(), 2);
    assert_eq!(harness.llm.routing_calls(), 2);
}

#[tokio::test]
async fn test_catalog_failure_skips_model_and_store() {
    let harness = Harness::with_catalog(
        StaticCatalog::failing("AccessDeniedException: not authorized"),
        MockDatabaseClient::sample(),
        MockLlmClient::new(),
    );

    let response = harness
        .context
        .handler()
        .handle(ApiRequest::for_question("How many orders are there?"))
        .await;

    assert_eq!(response.status_code, 500);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["kind"], "catalog");

    assert_eq!(harness.catalog.call_count(), 2);
    assert_eq!(harness.llm.call_count(), 0);
    assert_eq!(harness.store.execution_count(), 0);
}

#[tokio::test]
async fn test_write_statement_is_never_executed() {
    let harness = Harness::new(
        MockDatabaseClient::sample(),
        MockLlmClient::new().with_response("SQLQuery:", " DROP TABLE \"orders\""),
    );

    let response = harness
        .context
        .handler()
        .handle(ApiRequest::for_question("Remove the orders table"))
        .await;

    assert_eq!(response.status_code, 500);
    assert_eq!(harness.store.execution_count(), 0);
}
