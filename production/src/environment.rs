//! Dependencies injected into the engine.

use bakehouse_core::environment::Clock;
use bakehouse_core::providers::{BatchStore, EventPublisher, OrderSource, RecipeSource};
use std::sync::Arc;

/// Collaborators the [`BatchService`](crate::service::BatchService) runs against.
///
/// Production wires real adapters; tests wire the in-memory mocks from
/// `bakehouse-testing`.
#[derive(Clone)]
pub struct ProductionEnvironment {
    /// Durable batch storage
    pub store: Arc<dyn BatchStore>,
    /// Recipe names and bills of materials
    pub recipes: Arc<dyn RecipeSource>,
    /// Customer orders
    pub orders: Arc<dyn OrderSource>,
    /// Lifecycle notifications
    pub events: Arc<dyn EventPublisher>,
    /// Time source for timestamps
    pub clock: Arc<dyn Clock>,
}

impl ProductionEnvironment {
    /// Create an environment from its collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn BatchStore>,
        recipes: Arc<dyn RecipeSource>,
        orders: Arc<dyn OrderSource>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            recipes,
            orders,
            events,
            clock,
        }
    }
}
