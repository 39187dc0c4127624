//! Composition root for glue-ask.
//!
//! Builds the catalog, stores and LLM client once and wires them into the
//! request handler shared by every request.

use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::info;

use crate::catalog::{CatalogIndex, CatalogSource, GlueCatalog, StaticCatalog};
use crate::config::{CatalogProvider, Config};
use crate::db::{
    AthenaClient, AthenaSettings, DatabaseBackend, MockDatabaseClient, PostgresClient,
    StoreHandle,
};
use crate::error::{AskError, Result};
use crate::handler::RequestHandler;
use crate::llm::{create_client, LlmHandle};
use crate::pipeline::{
    ChannelResolver, Pipeline, RetryOrchestrator, RoutingMode, SqlQueryEngine, StoreRegistry,
};

/// Long-lived collaborators shared by every request.
#[derive(Clone)]
pub struct AppContext {
    handler: RequestHandler,
    stores: StoreRegistry,
}

impl AppContext {
    /// Builds every collaborator from configuration.
    ///
    /// Fails when a store cannot be constructed; no requests are served
    /// without one.
    pub async fn build(config: &Config) -> Result<Self> {
        let sdk_config = if needs_aws(config) {
            Some(load_aws_config(config.catalog.region.as_deref()).await)
        } else {
            None
        };

        let source: Arc<dyn CatalogSource> = match config.catalog.provider {
            CatalogProvider::Glue => Arc::new(GlueCatalog::new(require_sdk(&sdk_config)?)),
            CatalogProvider::Mock => Arc::new(StaticCatalog::sample()),
        };
        let catalog = catalog_index(source, config);

        let stores = build_stores(config, sdk_config.as_ref()).await?;
        let llm = create_client(&config.llm)?;

        info!(
            catalog = %config.catalog_database(),
            store = config.store.backend.as_str(),
            llm = %config.llm.provider,
            routing = %config.routing.mode,
            "Application context ready"
        );

        Ok(Self::from_parts(catalog, stores, llm, config.routing.mode))
    }

    /// Wires already-built collaborators into the pipeline.
    pub fn from_parts(
        catalog: CatalogIndex,
        stores: StoreRegistry,
        llm: LlmHandle,
        mode: RoutingMode,
    ) -> Self {
        let resolver = ChannelResolver::new(catalog, Arc::clone(&llm), stores.clone(), mode);
        let engine = SqlQueryEngine::new(llm);
        let orchestrator = RetryOrchestrator::new(Arc::new(Pipeline::new(resolver, engine)));

        Self {
            handler: RequestHandler::new(orchestrator),
            stores,
        }
    }

    /// The request handler.
    pub fn handler(&self) -> RequestHandler {
        self.handler.clone()
    }

    /// Releases store connections.
    pub async fn close(&self) -> Result<()> {
        self.stores.default_store().close().await
    }
}

/// Parsed routing lists `routing.databases` next to the configured database
/// so the model can name them.
fn catalog_index(source: Arc<dyn CatalogSource>, config: &Config) -> CatalogIndex {
    let index = CatalogIndex::new(source, config.catalog_database());
    match config.routing.mode {
        RoutingMode::Parsed => index.with_databases(config.routing.databases.iter().cloned()),
        RoutingMode::Static => index,
    }
}

fn needs_aws(config: &Config) -> bool {
    config.catalog.provider == CatalogProvider::Glue
        || config.store.backend == DatabaseBackend::Athena
}

fn require_sdk(sdk_config: &Option<SdkConfig>) -> Result<&SdkConfig> {
    sdk_config
        .as_ref()
        .ok_or_else(|| AskError::internal("AWS configuration was not loaded"))
}

/// Loads the shared AWS configuration from the default provider chain.
async fn load_aws_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// Builds the default store plus per-database stores for parsed routing.
async fn build_stores(config: &Config, sdk_config: Option<&SdkConfig>) -> Result<StoreRegistry> {
    let database = config.catalog_database().to_string();

    match config.store.backend {
        DatabaseBackend::Athena => {
            let sdk_config =
                sdk_config.ok_or_else(|| AskError::internal("AWS configuration was not loaded"))?;
            let settings = AthenaSettings {
                database: database.clone(),
                work_group: config.store.work_group.clone(),
                output_location: config.store.output_location()?,
                poll_interval: Duration::from_millis(config.store.poll_interval_ms),
                max_wait: Duration::from_secs(config.store.max_wait_secs),
            };
            let athena = AthenaClient::new(sdk_config, settings);

            let mut registry = StoreRegistry::new(Arc::new(athena.clone()))
                .with_store(database.as_str(), Arc::new(athena.clone()));
            for extra in &config.routing.databases {
                let store = athena.for_database(extra.as_str());
                registry = registry.with_store(extra.as_str(), Arc::new(store));
            }
            Ok(registry)
        }
        DatabaseBackend::Postgres => {
            let conn = config.store.postgres.as_ref().ok_or_else(|| {
                AskError::config("store.postgres (DATABASE_URL) is required for postgres")
            })?;
            let store: StoreHandle = Arc::new(PostgresClient::connect(conn).await?);
            Ok(StoreRegistry::new(Arc::clone(&store)).with_store(database, store))
        }
        DatabaseBackend::Mock => {
            let store: StoreHandle = Arc::new(MockDatabaseClient::sample());
            Ok(StoreRegistry::new(Arc::clone(&store)).with_store(database, store))
        }
    }
}
