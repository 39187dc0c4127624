//! Channel resolution.
//!
//! Asks the model which catalog database (and table) holds the data for a
//! question and maps the answer onto a registered store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::catalog::CatalogIndex;
use crate::db::StoreHandle;
use crate::error::Result;
use crate::llm::prompt::{build_messages, build_routing_prompt};
use crate::llm::{parse_route, LlmHandle};
use crate::pipeline::RoutingMode;

/// Channel id of the single configured store.
pub const STATIC_CHANNEL_ID: &str = "db";

/// How a channel was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The single configured channel; the routing completion was not used.
    Static,
    /// The routing completion named this database and, optionally, table.
    Parsed {
        database: String,
        table: Option<String>,
    },
}

/// The store a question is answered against.
#[derive(Clone)]
pub struct ChannelDecision {
    pub channel_id: String,
    pub store: StoreHandle,
    pub route: Route,
}

impl fmt::Debug for ChannelDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDecision")
            .field("channel_id", &self.channel_id)
            .field("dialect", &self.store.dialect())
            .field("route", &self.route)
            .finish()
    }
}

/// Stores known to the resolver: the default plus any per-database stores.
#[derive(Clone)]
pub struct StoreRegistry {
    default: StoreHandle,
    by_database: HashMap<String, StoreHandle>,
}

impl StoreRegistry {
    /// Creates a registry with only the default store.
    pub fn new(default: StoreHandle) -> Self {
        Self {
            default,
            by_database: HashMap::new(),
        }
    }

    /// Registers the store answering questions about `database`.
    pub fn with_store(mut self, database: impl Into<String>, store: StoreHandle) -> Self {
        self.by_database
            .insert(database.into().to_lowercase(), store);
        self
    }

    /// The default store.
    pub fn default_store(&self) -> StoreHandle {
        Arc::clone(&self.default)
    }

    /// The store registered for `database`, matched case-insensitively.
    pub fn get(&self, database: &str) -> Option<StoreHandle> {
        self.by_database.get(&database.to_lowercase()).cloned()
    }

    /// Number of per-database stores.
    pub fn len(&self) -> usize {
        self.by_database.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_database.is_empty()
    }
}

/// Picks the channel a question is answered against.
#[derive(Clone)]
pub struct ChannelResolver {
    catalog: CatalogIndex,
    llm: LlmHandle,
    stores: StoreRegistry,
    mode: RoutingMode,
}

impl ChannelResolver {
    pub fn new(
        catalog: CatalogIndex,
        llm: LlmHandle,
        stores: StoreRegistry,
        mode: RoutingMode,
    ) -> Self {
        Self {
            catalog,
            llm,
            stores,
            mode,
        }
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// Reads the catalog, asks the model for a database and table, and
    /// returns the channel to query.
    ///
    /// Catalog and model errors propagate unchanged.
    pub async fn resolve(&self, question: &str) -> Result<ChannelDecision> {
        let start = Instant::now();
        let catalog = self.catalog.fetch_rendered().await?;
        let prompt = build_routing_prompt(question, &catalog);

        let completion = self.llm.complete(&build_messages(prompt)).await?;
        debug!(
            completion = %completion,
            duration_ms = start.elapsed().as_millis() as u64,
            "Routing completion received"
        );

        let decision = match self.mode {
            RoutingMode::Static => self.static_decision(),
            RoutingMode::Parsed => self.parsed_decision(&completion),
        };

        info!(channel = %decision.channel_id, mode = %self.mode, "Resolved channel");
        Ok(decision)
    }

    fn static_decision(&self) -> ChannelDecision {
        ChannelDecision {
            channel_id: STATIC_CHANNEL_ID.to_string(),
            store: self.stores.default_store(),
            route: Route::Static,
        }
    }

    fn parsed_decision(&self, completion: &str) -> ChannelDecision {
        let Some(answer) = parse_route(completion) else {
            warn!("Routing completion did not name a database, using default channel");
            return self.static_decision();
        };

        let Some(store) = self.stores.get(&answer.database) else {
            warn!(
                database = %answer.database,
                "No store registered for routed database, using default channel"
            );
            return self.static_decision();
        };

        let channel_id = match &answer.table {
            Some(table) => format!("{}.{}", answer.database, table),
            None => answer.database.clone(),
        };

        ChannelDecision {
            channel_id,
            store,
            route: Route::Parsed {
                database: answer.database,
                table: answer.table,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogTable, StaticCatalog};
    use crate::db::{DatabaseClient, MockDatabaseClient};
    use crate::error::AskError;
    use crate::llm::MockLlmClient;

    fn resolver(llm: Arc<MockLlmClient>, mode: RoutingMode) -> ChannelResolver {
        let catalog = CatalogIndex::new(Arc::new(StaticCatalog::sample()), "sales");
        let default: StoreHandle = Arc::new(MockDatabaseClient::new());
        let hr: StoreHandle = Arc::new(MockDatabaseClient::sample());
        let stores = StoreRegistry::new(default).with_store("HR", hr);
        ChannelResolver::new(catalog, llm, stores, mode)
    }

    #[tokio::test]
    async fn test_static_mode_ignores_completion() {
        let llm = Arc::new(MockLlmClient::new().then_return("database == hr"));
        let decision = resolver(llm.clone(), RoutingMode::Static)
            .resolve("How many employees?")
            .await
            .unwrap();

        assert_eq!(decision.channel_id, STATIC_CHANNEL_ID);
        assert_eq!(decision.route, Route::Static);
        assert_eq!(llm.routing_calls(), 1);
    }

    #[tokio::test]
    async fn test_routing_prompt_carries_question_and_catalog() {
        let llm = Arc::new(MockLlmClient::new());
        resolver(llm.clone(), RoutingMode::Static)
            .resolve("total revenue")
            .await
            .unwrap();

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("to answer the question total revenue"));
        assert!(prompt.contains("\ns3|sales|orders|amount"));
    }

    #[tokio::test]
    async fn test_parsed_mode_routes_to_registered_store() {
        let llm = Arc::new(
            MockLlmClient::new().then_return("database == hr\ndatabase.table == hr.employees"),
        );
        let decision = resolver(llm, RoutingMode::Parsed)
            .resolve("How many employees?")
            .await
            .unwrap();

        assert_eq!(decision.channel_id, "hr.employees");
        assert_eq!(
            decision.route,
            Route::Parsed {
                database: "hr".to_string(),
                table: Some("employees".to_string()),
            }
        );
        let schema = decision.store.introspect_schema().await.unwrap();
        assert!(schema.table("orders").is_some());
    }

    #[tokio::test]
    async fn test_parsed_mode_prompt_lists_extra_database() {
        let catalog = StaticCatalog::new(vec![
            CatalogTable::new("sales", "orders")
                .with_location("s3://lake/orders/")
                .with_columns(["amount"]),
            CatalogTable::new("hr", "employees")
                .with_location("s3://lake/employees/")
                .with_columns(["employee_id", "salary"]),
        ]);
        let index = CatalogIndex::new(Arc::new(catalog), "sales").with_databases(["hr"]);
        let stores = StoreRegistry::new(Arc::new(MockDatabaseClient::new()))
            .with_store("hr", Arc::new(MockDatabaseClient::sample()));
        let llm = Arc::new(
            MockLlmClient::new().then_return("database == hr\ndatabase.table == hr.employees"),
        );

        let decision = ChannelResolver::new(index, llm.clone(), stores, RoutingMode::Parsed)
            .resolve("Average salary?")
            .await
            .unwrap();

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("\ns3|sales|orders|amount"));
        assert!(prompt.contains("\ns3|hr|employees|salary"));
        assert_eq!(decision.channel_id, "hr.employees");
        let schema = decision.store.introspect_schema().await.unwrap();
        assert!(!schema.tables.is_empty());
    }

    #[tokio::test]
    async fn test_parsed_mode_falls_back_when_unregistered() {
        let llm = Arc::new(MockLlmClient::new().then_return("database == finance"));
        let decision = resolver(llm, RoutingMode::Parsed)
            .resolve("revenue?")
            .await
            .unwrap();
        assert_eq!(decision.route, Route::Static);
    }

    #[tokio::test]
    async fn test_parsed_mode_falls_back_when_unparseable() {
        let llm = Arc::new(MockLlmClient::new().then_return("No idea."));
        let decision = resolver(llm, RoutingMode::Parsed)
            .resolve("revenue?")
            .await
            .unwrap();
        assert_eq!(decision.channel_id, STATIC_CHANNEL_ID);
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let llm = Arc::new(MockLlmClient::new());
        let catalog = CatalogIndex::new(Arc::new(StaticCatalog::failing("AccessDenied")), "sales");
        let stores = StoreRegistry::new(Arc::new(MockDatabaseClient::new()));
        let resolver = ChannelResolver::new(catalog, llm.clone(), stores, RoutingMode::Static);

        let err = resolver.resolve("revenue?").await.unwrap_err();
        assert!(matches!(err, AskError::Catalog(_)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let llm = Arc::new(MockLlmClient::new().then_fail("rate limited"));
        let err = resolver(llm, RoutingMode::Static)
            .resolve("revenue?")
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::Llm(_)));
    }
}
