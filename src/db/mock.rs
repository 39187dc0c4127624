//! Mock store for testing and `--mock` mode.
//!
//! Returns scripted outcomes in order and records every statement it runs.

use super::{Column, ColumnInfo, DatabaseClient, QueryResult, Schema, Table, Value};
use crate::error::{AskError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A mock store that replays queued outcomes, then falls back to a
/// one-row default result.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    outcomes: Mutex<VecDeque<std::result::Result<QueryResult, String>>>,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock store with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new mock store with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    /// Schema matching the sample catalog used by `--mock` mode.
    pub fn sample() -> Self {
        Self::with_schema(Schema {
            tables: vec![
                Table::new("orders")
                    .with_column(Column::new("order_id", "bigint"))
                    .with_column(Column::new("customer_id", "bigint"))
                    .with_column(Column::new("amount", "double"))
                    .with_column(Column::new("order_date", "date")),
                Table::new("customers")
                    .with_column(Column::new("customer_id", "bigint"))
                    .with_column(Column::new("name", "varchar"))
                    .with_column(Column::new("country", "varchar")),
            ],
        })
    }

    /// Queues a successful result for the next execution.
    pub fn then_return(self, result: QueryResult) -> Self {
        self.lock_outcomes().push_back(Ok(result));
        self
    }

    /// Queues a failure for the next execution.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.lock_outcomes().push_back(Err(message.into()));
        self
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Number of statements executed so far.
    pub fn execution_count(&self) -> usize {
        self.executed().len()
    }

    fn lock_outcomes(
        &self,
    ) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<QueryResult, String>>> {
        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn default_result(sql: &str) -> QueryResult {
        QueryResult::with_data(
            vec![ColumnInfo::new("result", "varchar")],
            vec![vec![Value::String(format!("Mock result for: {sql}"))]],
        )
        .with_execution_time(Duration::from_millis(1))
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn dialect(&self) -> &str {
        "mock"
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        match self.lock_outcomes().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(AskError::query(message)),
            None => Ok(Self::default_result(sql)),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
