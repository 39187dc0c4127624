//! AWS Glue Data Catalog source.

use async_trait::async_trait;
use aws_sdk_glue::error::DisplayErrorContext;
use aws_sdk_glue::Client;
use tracing::debug;

use super::{CatalogSource, CatalogTable};
use crate::error::{AskError, Result};

/// Catalog source backed by the Glue `GetTables` API.
#[derive(Debug, Clone)]
pub struct GlueCatalog {
    client: Client,
}

impl GlueCatalog {
    /// Creates a source from a shared AWS configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl CatalogSource for GlueCatalog {
    async fn get_tables(&self, database: &str) -> Result<Vec<CatalogTable>> {
        let mut tables = Vec::new();
        let mut next_token: Option<String> = None;
        let mut page = 0usize;

        loop {
            page += 1;
            let output = self
                .client
                .get_tables()
                .database_name(database)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AskError::catalog(format!("{}", DisplayErrorContext(&e))))?;

            debug!(
                database,
                page,
                tables = output.table_list().len(),
                "Glue GetTables page"
            );

            tables.extend(output.table_list().iter().map(|table| {
                let descriptor = table.storage_descriptor();
                CatalogTable {
                    database: table.database_name().unwrap_or(database).to_string(),
                    name: table.name().to_string(),
                    location: descriptor.and_then(|sd| sd.location()).map(String::from),
                    parameters: table
                        .parameters()
                        .map(|p| p.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        .unwrap_or_default(),
                    columns: descriptor
                        .map(|sd| sd.columns().iter().map(|c| c.name().to_string()).collect())
                        .unwrap_or_default(),
                }
            }));

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(tables)
    }
}
