//! Catalog ingestion for glue-ask.
//!
//! Flattens the table/column metadata of one catalog database into
//! [`CatalogEntry`] rows and renders them as the pipe-delimited descriptor
//! block handed to the routing prompt.

mod glue;
mod mock;

pub use glue::GlueCatalog;
pub use mock::StaticCatalog;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Classification tag for tables stored in object storage.
pub const OBJECT_STORE_CLASSIFICATION: &str = "s3";

/// Location prefix that marks a table as object-storage backed.
const OBJECT_STORE_PREFIX: &str = "s3";

/// Table parameter holding the declared data format.
const CLASSIFICATION_PARAMETER: &str = "classification";

/// Structural metadata for one catalog table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogTable {
    /// Database the table belongs to.
    pub database: String,

    /// Table name.
    pub name: String,

    /// Storage location (e.g. `s3://bucket/path/`), if declared.
    pub location: Option<String>,

    /// Table parameters such as `classification`.
    pub parameters: BTreeMap<String, String>,

    /// Column names in declaration order.
    pub columns: Vec<String>,
}

impl CatalogTable {
    /// Creates a table with no location, parameters or columns.
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the storage location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets a table parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Appends columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Derives the classification tag.
    ///
    /// Object-storage locations always classify as [`OBJECT_STORE_CLASSIFICATION`];
    /// anything else uses the declared `classification` parameter, or an empty
    /// string when the table declares none.
    pub fn classification(&self) -> String {
        let in_object_store = self
            .location
            .as_deref()
            .is_some_and(|loc| loc.starts_with(OBJECT_STORE_PREFIX));

        if in_object_store {
            OBJECT_STORE_CLASSIFICATION.to_string()
        } else {
            self.parameters
                .get(CLASSIFICATION_PARAMETER)
                .cloned()
                .unwrap_or_default()
        }
    }
}

/// One flattened (classification, database, table, column) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub classification: String,
    pub database: String,
    pub table: String,
    pub column: String,
}

impl CatalogEntry {
    /// Renders the entry as `classification|database|table|column`.
    pub fn descriptor_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.classification, self.database, self.table, self.column
        )
    }
}

/// Source of catalog table metadata.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Lists every table of `database` in catalog order.
    async fn get_tables(&self, database: &str) -> Result<Vec<CatalogTable>>;
}

/// Reads and flattens the configured catalog databases.
#[derive(Clone)]
pub struct CatalogIndex {
    source: Arc<dyn CatalogSource>,
    database: String,
    extra_databases: Vec<String>,
}

impl CatalogIndex {
    /// Creates an index over `database` backed by `source`.
    pub fn new(source: Arc<dyn CatalogSource>, database: impl Into<String>) -> Self {
        Self {
            source,
            database: database.into(),
            extra_databases: Vec::new(),
        }
    }

    /// Also lists `databases`, after the configured one.
    ///
    /// Repeats of the configured database are skipped.
    pub fn with_databases<I, S>(mut self, databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for database in databases {
            let database = database.into();
            if !self.databases().any(|d| d.eq_ignore_ascii_case(&database)) {
                self.extra_databases.push(database);
            }
        }
        self
    }

    /// Returns the configured catalog database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Every database the index reads, configured one first.
    pub fn databases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.database.as_str())
            .chain(self.extra_databases.iter().map(String::as_str))
    }

    /// Fetches the flattened entries of every database in order; source
    /// errors propagate unmodified.
    pub async fn fetch(&self) -> Result<Vec<CatalogEntry>> {
        let start = Instant::now();
        let mut entries = Vec::new();
        let mut table_count = 0;

        for database in self.databases() {
            let tables = self.source.get_tables(database).await?;
            table_count += tables.len();
            entries.extend(flatten(database, &tables));
        }

        tracing::debug!(
            database = %self.database,
            extra_databases = self.extra_databases.len(),
            table_count,
            entry_count = entries.len(),
            duration_ms = start.elapsed().as_millis(),
            "Fetched catalog"
        );

        Ok(entries)
    }

    /// Fetches the catalog and renders it in one step.
    pub async fn fetch_rendered(&self) -> Result<String> {
        Ok(Self::render(&self.fetch().await?))
    }

    /// Renders entries as newline-prefixed descriptor lines.
    ///
    /// Each entry contributes `"\n" + classification|database|table|column`,
    /// so a non-empty block always starts with a newline.
    pub fn render(entries: &[CatalogEntry]) -> String {
        entries
            .iter()
            .map(|entry| format!("\n{}", entry.descriptor_line()))
            .collect()
    }
}

/// Flattens tables into one entry per column.
///
/// Tables that do not report their own database inherit `database`.
fn flatten(database: &str, tables: &[CatalogTable]) -> Vec<CatalogEntry> {
    tables
        .iter()
        .flat_map(|table| {
            let classification = table.classification();
            let table_db = if table.database.is_empty() {
                database
            } else {
                table.database.as_str()
            };
            table.columns.iter().map(move |column| CatalogEntry {
                classification: classification.clone(),
                database: table_db.to_string(),
                table: table.name.clone(),
                column: column.clone(),
            })
        })
        .collect()
}
