//! Shared fixtures for the integration tests.

use std::sync::Arc;

use glue_ask::app::AppContext;
use glue_ask::catalog::{CatalogIndex, StaticCatalog};
use glue_ask::db::MockDatabaseClient;
use glue_ask::llm::MockLlmClient;
use glue_ask::pipeline::{RoutingMode, StoreRegistry};

/// The doubles behind an [`AppContext`], kept so tests can inspect them.
pub struct Harness {
    pub catalog: Arc<StaticCatalog>,
    pub store: Arc<MockDatabaseClient>,
    pub llm: Arc<MockLlmClient>,
    pub context: AppContext,
}

impl Harness {
    pub fn new(store: MockDatabaseClient, llm: MockLlmClient) -> Self {
        Self::with_catalog(StaticCatalog::sample(), store, llm)
    }

    pub fn with_catalog(
        catalog: StaticCatalog,
        store: MockDatabaseClient,
        llm: MockLlmClient,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let store = Arc::new(store);
        let llm = Arc::new(llm);

        let context = AppContext::from_parts(
            CatalogIndex::new(catalog.clone(), "sales"),
            StoreRegistry::new(store.clone()),
            llm.clone(),
            RoutingMode::Static,
        );

        Self {
            catalog,
            store,
            llm,
            context,
        }
    }

    /// Sample catalog, sample schema and default model responses.
    pub fn sample() -> Self {
        Self::new(MockDatabaseClient::sample(), MockLlmClient::new())
    }
}
