//! In-memory catalog source for testing and `--mock` mode.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{CatalogSource, CatalogTable};
use crate::error::{AskError, Result};

/// A catalog source that returns a fixed table list.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    tables: Vec<CatalogTable>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StaticCatalog {
    /// Creates a source that lists `tables` for any database.
    pub fn new(tables: Vec<CatalogTable>) -> Self {
        Self {
            tables,
            ..Self::default()
        }
    }

    /// Creates a source whose every fetch fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// A small sales catalog used by `--mock` mode.
    pub fn sample() -> Self {
        Self::new(vec![
            CatalogTable::new("sales", "orders")
                .with_location("s3://sample-lake/sales/orders/")
                .with_parameter("classification", "parquet")
                .with_columns(["order_id", "customer_id", "amount", "order_date"]),
            CatalogTable::new("sales", "customers")
                .with_location("s3://sample-lake/sales/customers/")
                .with_parameter("classification", "csv")
                .with_columns(["customer_id", "name", "country"]),
        ])
    }

    /// Number of times the catalog has been read.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn get_tables(&self, database: &str) -> Result<Vec<CatalogTable>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(AskError::catalog(message.clone()));
        }

        Ok(self
            .tables
            .iter()
            .filter(|t| t.database.is_empty() || t.database == database)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_filters_by_database() {
        let catalog = StaticCatalog::new(vec![
            CatalogTable::new("sales", "orders"),
            CatalogTable::new("hr", "staff"),
        ]);

        let tables = catalog.get_tables("sales").await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "orders");
        assert_eq!(catalog.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_counts_calls() {
        let catalog = StaticCatalog::failing("unreachable");
        assert!(catalog.get_tables("sales").await.is_err());
        assert!(catalog.get_tables("sales").await.is_err());
        assert_eq!(catalog.call_count(), 2);
    }
}
