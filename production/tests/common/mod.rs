//! Shared harness for the engine integration tests.

#![allow(dead_code)] // Not every test binary uses every helper

use bakehouse_core::environment::Clock;
use bakehouse_core::providers::EventPublisher;
use bakehouse_core::types::{Recipe, StoreId};
use bakehouse_production::{BatchService, EngineConfig, ProductionEnvironment};
use bakehouse_testing::{
    InMemoryBatchStore, MockOrderSource, MockRecipeSource, RecordingEventPublisher, fixtures,
    test_clock,
};
use std::sync::Arc;

/// A service wired to in-memory collaborators, with handles to inspect them.
pub struct Harness {
    pub service: BatchService,
    pub store_id: StoreId,
    pub store: InMemoryBatchStore,
    pub recipes: MockRecipeSource,
    pub orders: MockOrderSource,
    pub events: RecordingEventPublisher,
}

impl Harness {
    /// Default engine config, fixed clock, recording publisher
    pub fn new() -> Self {
        Self::build(None, Arc::new(test_clock()))
    }

    /// Replace the recording publisher with `publisher`
    pub fn with_publisher(publisher: Arc<dyn EventPublisher>) -> Self {
        Self::build(Some(publisher), Arc::new(test_clock()))
    }

    /// Use `clock` instead of the fixed test clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::build(None, clock)
    }

    fn build(publisher: Option<Arc<dyn EventPublisher>>, clock: Arc<dyn Clock>) -> Self {
        let store = InMemoryBatchStore::new();
        let recipes = MockRecipeSource::new();
        let orders = MockOrderSource::new();
        let events = RecordingEventPublisher::new();
        let publisher = publisher.unwrap_or_else(|| Arc::new(events.clone()));

        let service = BatchService::new(
            ProductionEnvironment::new(
                Arc::new(store.clone()),
                Arc::new(recipes.clone()),
                Arc::new(orders.clone()),
                publisher,
                clock,
            ),
            EngineConfig::default(),
        );

        Self {
            service,
            store_id: StoreId::new(),
            store,
            recipes,
            orders,
            events,
        }
    }

    /// Register a recipe for this harness's store
    pub fn add_recipe(&self, name: &str, ingredients: &[(&str, &str, &str)]) -> Recipe {
        let recipe = fixtures::recipe(name, ingredients);
        self.recipes.insert(self.store_id, recipe.clone());
        recipe
    }

    /// A bread recipe with two ingredients (flour 0.5 kg, salt 0.01 kg per loaf)
    pub fn bread(&self) -> Recipe {
        self.add_recipe("Country Loaf", &[("Flour", "kg", "0.5"), ("Salt", "kg", "0.01")])
    }
}
