//! Backing store abstraction for glue-ask.
//!
//! Provides a trait-based interface over the SQL-queryable stores that
//! generated queries run against, so Athena, PostgreSQL and the in-memory
//! mock can be used interchangeably.

mod athena;
mod mock;
mod postgres;
mod schema;
mod types;

pub use athena::{AthenaClient, AthenaSettings};
pub use mock::MockDatabaseClient;
pub use postgres::PostgresClient;
pub use schema::{Column, Schema, Table};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use std::sync::Arc;

use crate::error::Result;
use async_trait::async_trait;

/// Maximum rows kept from a single query result.
pub const MAX_ROWS: usize = 1000;

/// Supported store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// Amazon Athena over the Glue catalog.
    #[default]
    Athena,
    /// PostgreSQL via sqlx.
    Postgres,
    /// In-memory mock store.
    Mock,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Athena => "athena",
            Self::Postgres => "postgres",
            Self::Mock => "mock",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "athena" => Some(Self::Athena),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Interface for SQL-queryable backing stores.
///
/// Implementations hold no per-request mutable state and are shared
/// read-only across requests.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// SQL dialect name used in prompts (e.g. `awsathena`, `postgresql`).
    fn dialect(&self) -> &str;

    /// Introspects the tables visible to this store.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL statement and returns its rows.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Releases any pooled connections.
    async fn close(&self) -> Result<()>;
}

/// Shared handle to a backing store, built once at startup.
pub type StoreHandle = Arc<dyn DatabaseClient>;
