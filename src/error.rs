//! Error types for glue-ask.
//!
//! Defines the main error enum threaded through every pipeline stage.

use thiserror::Error;

/// Main error type for glue-ask operations.
#[derive(Error, Debug)]
pub enum AskError {
    /// Catalog access errors (metadata service unreachable, database absent, etc.)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Store connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query generation or execution errors (syntax errors, missing columns, timeouts, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// LLM API errors (rate limits, auth, malformed completions, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request validation errors (missing question, malformed body).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AskError {
    /// Creates a catalog error with the given message.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "Catalog Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Validation(_) => "Validation Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns a short machine-readable kind for structured responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "catalog",
            Self::Connection(_) => "connection",
            Self::Query(_) => "query",
            Self::Llm(_) => "llm",
            Self::Config(_) => "config",
            Self::Validation(_) => "validation",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns the underlying description without the category prefix.
    ///
    /// This is the text fed back to the model when an attempt is retried.
    pub fn detail(&self) -> &str {
        match self {
            Self::Catalog(msg)
            | Self::Connection(msg)
            | Self::Query(msg)
            | Self::Llm(msg)
            | Self::Config(msg)
            | Self::Validation(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

/// Result type alias using AskError.
pub type Result<T> = std::result::Result<T, AskError>;
