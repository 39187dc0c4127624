//! HTTP routes exercised in-process with `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use glue_ask::db::MockDatabaseClient;
use glue_ask::handler::ApiResponse;
use glue_ask::llm::MockLlmClient;
use glue_ask::server::router;
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use super::common::Harness;

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = router(Harness::sample().context.handler());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_query_route_answers() {
    let harness = Harness::sample();
    let app = router(harness.context.handler());

    let response = app
        .oneshot(post("/query", r#"{"query": "How many orders are there?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("Content-Type").unwrap(),
        "application/json"
    );
    let answer: String = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(answer.starts_with("The query returned"));
    assert_eq!(harness.store.execution_count(), 1);
}

#[tokio::test]
async fn test_query_route_rejects_empty_query() {
    let app = router(Harness::sample().context.handler());

    let response = app.oneshot(post("/query", r#"{"query": ""}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        r#"{"message": "Query not provided"}"#
    );
}

#[tokio::test]
async fn test_query_route_reports_failure() {
    let harness = Harness::new(
        MockDatabaseClient::sample()
            .then_fail("SYNTAX_ERROR: line 1:1")
            .then_fail("SYNTAX_ERROR: line 1:2"),
        MockLlmClient::new(),
    );
    let app = router(harness.context.handler());

    let response = app
        .oneshot(post("/query", r#"{"query": "How many orders are there?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["kind"], "query");
}

#[tokio::test]
async fn test_invoke_route_returns_framed_response() {
    let app = router(Harness::sample().context.handler());
    let event = serde_json::json!({ "body": r#"{"query": ""}"# }).to_string();

    let response = app.oneshot(post("/invoke", event)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let framed: ApiResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(framed.status_code, 400);
    assert_eq!(framed.body, r#"{"message": "Query not provided"}"#);
}

#[tokio::test]
async fn test_invoke_route_rejects_malformed_event() {
    let app = router(Harness::sample().context.handler());

    let response = app.oneshot(post("/invoke", "not json")).await.unwrap();

    let framed: ApiResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(framed.status_code, 400);
}
