//! Request handling.
//!
//! Validates the request body, runs the retrying pipeline and frames the
//! outcome as an [`ApiResponse`].

use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, Serializer};
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::{AskError, Result};
use crate::pipeline::RetryOrchestrator;

/// Message returned when the body has no usable `query`.
pub const QUERY_NOT_PROVIDED: &str = "Query not provided";

/// Message returned when the body is not JSON.
pub const INVALID_JSON: &str = "Request body is not valid JSON";

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";

/// An incoming request event; `body` is the raw JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    #[serde(default)]
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    /// Builds a request whose body is `{"query": question}`.
    pub fn for_question(question: &str) -> Self {
        Self::new(json!({ "query": question }).to_string())
    }
}

/// The framed response: status code, JSON body text and headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl ApiResponse {
    fn json(status_code: u16, body: serde_json::Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
        Self {
            status_code,
            body: encode_body(&body),
            headers,
        }
    }

    /// `200` with the answer JSON-encoded as a string.
    pub fn answer(answer: &str) -> Self {
        Self::json(200, json!(answer))
    }

    /// `400` with `{"message": ...}`.
    pub fn bad_request(message: &str) -> Self {
        Self::json(400, json!({ "message": message }))
    }

    /// `500` with `{"message": ..., "kind": ...}`.
    pub fn failure(err: &AskError) -> Self {
        Self::json(500, json!({ "message": err.to_string(), "kind": err.kind() }))
    }
}

/// Encodes a body the way Python's `json.dumps` does: `", "` and `": "`
/// separators and non-ASCII characters escaped as `\uXXXX`.
fn encode_body(value: &serde_json::Value) -> String {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, SpacedAsciiFormatter);
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Extracts the question from a raw request body.
///
/// A missing or blank body, a missing `query`, a non-string `query` and an
/// empty `query` all count as no query. Any other string, whitespace
/// included, is passed through untouched.
pub fn extract_query(body: Option<&str>) -> Result<String> {
    let Some(body) = body.filter(|b| !b.trim().is_empty()) else {
        return Err(AskError::validation(QUERY_NOT_PROVIDED));
    };

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| AskError::validation(INVALID_JSON))?;

    value
        .get("query")
        .and_then(serde_json::Value::as_str)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AskError::validation(QUERY_NOT_PROVIDED))
}

/// Turns request events into framed responses.
#[derive(Clone)]
pub struct RequestHandler {
    orchestrator: RetryOrchestrator,
}

impl RequestHandler {
    pub fn new(orchestrator: RetryOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Handles one request. Never fails: every outcome is a response.
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let query = match extract_query(request.body.as_deref()) {
            Ok(query) => query,
            Err(err) => {
                warn!(reason = err.detail(), "Rejected request");
                return ApiResponse::bad_request(err.detail());
            }
        };

        info!(query_len = query.len(), "Handling query");

        match self.orchestrator.execute(&query).await {
            Ok(answer) => ApiResponse::answer(&answer),
            Err(err) => {
                error!(category = err.category(), error = %err, "Query failed after retry");
                ApiResponse::failure(&err)
            }
        }
    }
}
