//! Mock recipe and order sources.

use bakehouse_core::error::{OrderSourceError, RecipeSourceError};
use bakehouse_core::providers::{OrderSource, RecipeSource};
use bakehouse_core::types::{DateRange, Order, Recipe, RecipeId, StoreId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Mock recipe source.
///
/// Unknown recipes answer [`RecipeSourceError::NotFound`]; calling
/// [`MockRecipeSource::set_unavailable`] makes every lookup fail with
/// [`RecipeSourceError::Unavailable`].
#[derive(Clone, Debug, Default)]
pub struct MockRecipeSource {
    recipes: Arc<RwLock<HashMap<(StoreId, RecipeId), Recipe>>>,
    unavailable: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
}

impl MockRecipeSource {
    /// Create an empty recipe source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe for a store
    pub fn insert(&self, store_id: StoreId, recipe: Recipe) {
        if let Ok(mut recipes) = self.recipes.write() {
            recipes.insert((store_id, recipe.id), recipe);
        }
    }

    /// Remove a recipe, as if it had been deleted
    pub fn remove(&self, store_id: StoreId, recipe_id: RecipeId) {
        if let Ok(mut recipes) = self.recipes.write() {
            recipes.remove(&(store_id, recipe_id));
        }
    }

    /// Toggle simulated outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of lookups served so far
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn lookup(&self, store_id: StoreId, recipe_id: RecipeId) -> Result<Recipe, RecipeSourceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RecipeSourceError::Unavailable(
                "recipe service offline".to_string(),
            ));
        }
        self.recipes
            .read()
            .map_err(|_| RecipeSourceError::Unavailable("lock poisoned".to_string()))?
            .get(&(store_id, recipe_id))
            .cloned()
            .ok_or(RecipeSourceError::NotFound(recipe_id))
    }
}

impl RecipeSource for MockRecipeSource {
    fn get_recipe(
        &self,
        store_id: StoreId,
        recipe_id: RecipeId,
    ) -> Pin<Box<dyn Future<Output = Result<Recipe, RecipeSourceError>> + Send + '_>> {
        Box::pin(async move { self.lookup(store_id, recipe_id) })
    }
}

/// Mock order source.
#[derive(Clone, Debug, Default)]
pub struct MockOrderSource {
    orders: Arc<RwLock<Vec<(StoreId, Order)>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockOrderSource {
    /// Create an empty order source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an order for a store
    pub fn insert(&self, store_id: StoreId, order: Order) {
        if let Ok(mut orders) = self.orders.write() {
            orders.push((store_id, order));
        }
    }

    /// Toggle simulated outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn query(&self, store_id: StoreId, range: DateRange) -> Result<Vec<Order>, OrderSourceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OrderSourceError::Unavailable(
                "order service offline".to_string(),
            ));
        }
        Ok(self
            .orders
            .read()
            .map_err(|_| OrderSourceError::Unavailable("lock poisoned".to_string()))?
            .iter()
            .filter(|(owner, order)| *owner == store_id && range.contains(order.due_date))
            .map(|(_, order)| order.clone())
            .collect())
    }
}

impl OrderSource for MockOrderSource {
    fn find_orders_by_date_range(
        &self,
        store_id: StoreId,
        range: DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Order>, OrderSourceError>> + Send + '_>> {
        Box::pin(async move { self.query(store_id, range) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use bakehouse_core::types::OrderStatus;

    #[tokio::test]
    async fn recipe_lookup_is_store_scoped() {
        let source = MockRecipeSource::new();
        let ours = StoreId::new();
        let recipe = fixtures::recipe("Rye", &[("Rye flour", "g", "0.4")]);
        source.insert(ours, recipe.clone());

        assert_eq!(source.get_recipe(ours, recipe.id).await.unwrap(), recipe);
        assert_eq!(
            source.get_recipe(StoreId::new(), recipe.id).await,
            Err(RecipeSourceError::NotFound(recipe.id))
        );
        assert_eq!(source.lookup_count(), 2);
    }

    #[tokio::test]
    async fn orders_filtered_by_store_and_due_date() {
        let source = MockOrderSource::new();
        let store_id = StoreId::new();
        let day = fixtures::production_date();
        let next_day = day.succ_opt().unwrap();
        let recipe_id = RecipeId::new();

        source.insert(store_id, fixtures::order(OrderStatus::Received, day, &[(recipe_id, 2)]));
        source.insert(
            store_id,
            fixtures::order(OrderStatus::Received, next_day, &[(recipe_id, 4)]),
        );
        source.insert(
            StoreId::new(),
            fixtures::order(OrderStatus::Received, day, &[(recipe_id, 9)]),
        );

        let orders = source
            .find_orders_by_date_range(store_id, DateRange::single_day(day))
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].due_date, day);
    }
}
