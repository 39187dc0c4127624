//! Amazon Athena store implementation.
//!
//! Runs statements through `StartQueryExecution`, polls until the query
//! reaches a terminal state, then pages through `GetQueryResults`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client;
use tracing::{debug, warn};

use crate::db::{
    Column, ColumnInfo, DatabaseClient, QueryResult, Row, Schema, Table, Value, MAX_ROWS,
};
use crate::error::{AskError, Result};

/// Data catalog Athena resolves Glue databases through.
const DEFAULT_DATA_CATALOG: &str = "AwsDataCatalog";

/// Dialect name reported to the SQL generation prompt.
const ATHENA_DIALECT: &str = "awsathena";

/// Page size for `GetQueryResults`.
const RESULTS_PAGE_SIZE: i32 = 1000;

/// Connection settings for an Athena store.
#[derive(Debug, Clone)]
pub struct AthenaSettings {
    /// Glue database queries run against.
    pub database: String,
    /// Athena work group.
    pub work_group: String,
    /// S3 location receiving query output.
    pub output_location: String,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Ceiling on total query runtime.
    pub max_wait: Duration,
}

/// Athena store bound to one Glue database.
#[derive(Debug, Clone)]
pub struct AthenaClient {
    client: Client,
    settings: AthenaSettings,
}

impl AthenaClient {
    /// Creates a store from a shared AWS configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig, settings: AthenaSettings) -> Self {
        Self {
            client: Client::new(sdk_config),
            settings,
        }
    }

    /// Returns a store sharing this client but bound to another database.
    pub fn for_database(&self, database: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            settings: AthenaSettings {
                database: database.into(),
                ..self.settings.clone()
            },
        }
    }

    /// Database this store is bound to.
    pub fn database(&self) -> &str {
        &self.settings.database
    }

    async fn start(&self, sql: &str) -> Result<String> {
        let context = QueryExecutionContext::builder()
            .catalog(DEFAULT_DATA_CATALOG)
            .database(&self.settings.database)
            .build();
        let output = ResultConfiguration::builder()
            .output_location(&self.settings.output_location)
            .build();

        let started = self
            .client
            .start_query_execution()
            .query_string(sql)
            .query_execution_context(context)
            .result_configuration(output)
            .work_group(&self.settings.work_group)
            .send()
            .await
            .map_err(|e| AskError::query(format!("{}", DisplayErrorContext(&e))))?;

        started
            .query_execution_id()
            .map(String::from)
            .ok_or_else(|| AskError::query("Athena returned no query execution id"))
    }

    /// Polls until the execution succeeds, fails, or exceeds `max_wait`.
    async fn wait_for(&self, execution_id: &str) -> Result<()> {
        let start = Instant::now();

        loop {
            let output = self
                .client
                .get_query_execution()
                .query_execution_id(execution_id)
                .send()
                .await
                .map_err(|e| AskError::query(format!("{}", DisplayErrorContext(&e))))?;

            let status = output.query_execution().and_then(|q| q.status());
            let reason = status
                .and_then(|s| s.state_change_reason())
                .unwrap_or("no reason given");

            match status.and_then(|s| s.state()) {
                Some(QueryExecutionState::Succeeded) => return Ok(()),
                Some(QueryExecutionState::Failed) => return Err(AskError::query(reason)),
                Some(QueryExecutionState::Cancelled) => {
                    return Err(AskError::query(format!("Query was cancelled: {reason}")))
                }
                _ => {}
            }

            if start.elapsed() >= self.settings.max_wait {
                warn!(execution_id, "Athena query exceeded wait ceiling, stopping");
                self.stop(execution_id).await;
                return Err(AskError::query(format!(
                    "Query timed out after {} seconds",
                    self.settings.max_wait.as_secs()
                )));
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Asks Athena to stop `execution_id`; returns whether it accepted.
    ///
    /// A refused stop is logged, the query may still be running.
    async fn stop(&self, execution_id: &str) -> bool {
        match self
            .client
            .stop_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    execution_id,
                    error = %DisplayErrorContext(&e),
                    "Failed to stop Athena query, it may still be running"
                );
                false
            }
        }
    }

    async fn fetch_results(&self, execution_id: &str) -> Result<QueryResult> {
        let mut columns: Vec<ColumnInfo> = Vec::new();
        let mut rows: Vec<Row> = Vec::new();
        let mut next_token: Option<String> = None;
        let mut first_page = true;
        let mut was_truncated = false;

        loop {
            let output = self
                .client
                .get_query_results()
                .query_execution_id(execution_id)
                .max_results(RESULTS_PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AskError::query(format!("{}", DisplayErrorContext(&e))))?;

            let Some(result_set) = output.result_set() else {
                break;
            };

            if first_page {
                columns = result_set
                    .result_set_metadata()
                    .map(|m| {
                        m.column_info()
                            .iter()
                            .map(|c| ColumnInfo::new(c.name(), c.r#type()))
                            .collect()
                    })
                    .unwrap_or_default();
            }

            let mut page_rows: Vec<Row> = result_set
                .rows()
                .iter()
                .map(|row| {
                    row.data()
                        .iter()
                        .enumerate()
                        .map(|(i, datum)| {
                            let data_type =
                                columns.get(i).map_or("varchar", |c| c.data_type.as_str());
                            convert_value(datum.var_char_value(), data_type)
                        })
                        .collect()
                })
                .collect();

            // SELECT results repeat the column names as the first row.
            if first_page && is_header_row(page_rows.first(), &columns) {
                page_rows.remove(0);
            }
            first_page = false;

            let remaining = MAX_ROWS.saturating_sub(rows.len());
            if page_rows.len() > remaining {
                page_rows.truncate(remaining);
                was_truncated = true;
            }
            rows.extend(page_rows);

            match output.next_token() {
                Some(token) if !was_truncated => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        if was_truncated {
            warn!(execution_id, max_rows = MAX_ROWS, "Athena result truncated");
        }

        let mut result = QueryResult::with_data(columns, rows);
        result.was_truncated = was_truncated;
        Ok(result)
    }
}

#[async_trait]
impl DatabaseClient for AthenaClient {
    fn dialect(&self) -> &str {
        ATHENA_DIALECT
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        let mut tables = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_table_metadata()
                .catalog_name(DEFAULT_DATA_CATALOG)
                .database_name(&self.settings.database)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AskError::query(format!("{}", DisplayErrorContext(&e))))?;

            tables.extend(output.table_metadata_list().iter().map(|meta| {
                let columns = meta
                    .columns()
                    .iter()
                    .chain(meta.partition_keys().iter())
                    .map(|c| Column::new(c.name(), c.r#type().unwrap_or("varchar")))
                    .collect();
                Table {
                    name: meta.name().to_string(),
                    columns,
                }
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(
            database = %self.settings.database,
            tables = tables.len(),
            "Introspected Athena schema"
        );
        Ok(Schema { tables })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        let execution_id = self.start(sql).await?;
        debug!(%execution_id, database = %self.settings.database, "Started Athena query");

        self.wait_for(&execution_id).await?;
        let result = self.fetch_results(&execution_id).await?;

        Ok(result.with_execution_time(start.elapsed()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Returns true when `row` repeats the column names.
fn is_header_row(row: Option<&Row>, columns: &[ColumnInfo]) -> bool {
    match row {
        Some(row) if !columns.is_empty() && row.len() == columns.len() => row
            .iter()
            .zip(columns)
            .all(|(value, column)| matches!(value, Value::String(s) if *s == column.name)),
        _ => false,
    }
}

/// Converts an Athena string datum using the column's declared type.
///
/// Athena returns every value as text; numeric and boolean types are parsed
/// back so the summarization prompt sees unquoted numbers.
fn convert_value(raw: Option<&str>, data_type: &str) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };

    let parsed = match data_type.to_lowercase().as_str() {
        "tinyint" | "smallint" | "integer" | "int" | "bigint" => raw.parse().ok().map(Value::Int),
        "float" | "real" | "double" => raw.parse().ok().map(Value::Float),
        "boolean" => raw.parse().ok().map(Value::Bool),
        _ => None,
    };

    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}
