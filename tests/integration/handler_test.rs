//! Request validation and response framing through the full handler.

use glue_ask::handler::{ApiRequest, INVALID_JSON, QUERY_NOT_PROVIDED};
use pretty_assertions::assert_eq;

use super::common::Harness;

#[tokio::test]
async fn test_empty_query_is_rejected_before_any_work() {
    let harness = Harness::sample();

    let response = harness
        .context
        .handler()
        .handle(ApiRequest::new(r#"{"query": ""}"#))
        .await;

    assert_eq!(response.status_code, 400);
    assert_eq!(response.body, r#"{"message": "Query not provided"}"#);
    assert_eq!(
        response.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );

    assert_eq!(harness.catalog.call_count(), 0);
    assert_eq!(harness.llm.call_count(), 0);
    assert_eq!(harness.store.execution_count(), 0);
}

#[tokio::test]
async fn test_missing_body_and_missing_query() {
    let harness = Harness::sample();
    let handler = harness.context.handler();

    for request in [ApiRequest::default(), ApiRequest::new("{}")] {
        let response = handler.handle(request).await;
        assert_eq!(response.status_code, 400);
        assert!(response.body.contains(QUERY_NOT_PROVIDED));
    }

    assert_eq!(harness.llm.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_body() {
    let harness = Harness::sample();

    let response = harness
        .context
        .handler()
        .handle(ApiRequest::new("query=revenue"))
        .await;

    assert_eq!(response.status_code, 400);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["message"], INVALID_JSON);
    assert_eq!(harness.catalog.call_count(), 0);
}

#[tokio::test]
async fn test_answer_is_json_string() {
    let harness = Harness::sample();

    let response = harness
        .context
        .handler()
        .handle(ApiRequest::for_question("How many customers are there?"))
        .await;

    assert_eq!(response.status_code, 200);
    let answer: String = serde_json::from_str(&response.body).unwrap();
    assert!(answer.starts_with("The query returned"));
}

#[tokio::test]
async fn test_whitespace_query_reaches_pipeline() {
    let harness = Harness::sample();

    let response = harness
        .context
        .handler()
        .handle(ApiRequest::new(r#"{"query": "   "}"#))
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(harness.catalog.call_count(), 1);
    assert_eq!(harness.llm.routing_calls(), 1);
    assert_eq!(harness.store.execution_count(), 1);
}
