//! HTTP front end.
//!
//! `POST /query` takes `{"query": ...}` and answers with the framed
//! response as real HTTP status, headers and body. `POST /invoke` takes a
//! `{"body": "<json text>"}` event and answers with the framed response
//! itself as JSON. `GET /health` answers `ok`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{AskError, Result};
use crate::handler::{ApiRequest, ApiResponse, RequestHandler, INVALID_JSON};

/// Builds the application router.
pub fn router(handler: RequestHandler) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/query", post(handle_query))
        .route("/invoke", post(handle_invoke))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(handler))
}

/// Binds `bind` and serves until Ctrl-C.
pub async fn serve(bind: &str, handler: RequestHandler) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| AskError::config(format!("Invalid bind address: {bind}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AskError::config(format!("Cannot bind {addr}: {e}")))?;

    info!(%addr, "Listening");
    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AskError::internal(format!("HTTP server failed: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn handle_query(State(handler): State<Arc<RequestHandler>>, body: String) -> Response {
    into_http(handler.handle(ApiRequest::new(body)).await)
}

async fn handle_invoke(
    State(handler): State<Arc<RequestHandler>>,
    body: String,
) -> Json<ApiResponse> {
    let response = match serde_json::from_str::<ApiRequest>(&body) {
        Ok(event) => handler.handle(event).await,
        Err(_) => ApiResponse::bad_request(INVALID_JSON),
    };
    Json(response)
}

/// Maps a framed response onto a real HTTP response.
fn into_http(response: ApiResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        builder = builder.header(name, value);
    }

    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
