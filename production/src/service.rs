//! The imperative shell around the planners.
//!
//! Every mutating operation follows the same steps:
//!
//! 1. Load what it needs from the store and the sources
//! 2. Hand it to a pure planner, which returns a [`Plan`]
//! 3. Commit the plan's [`ChangeSet`](bakehouse_core::ChangeSet) in one atomic call
//! 4. Publish the plan's events, logging (never returning) publish failures
//!
//! Nothing is published when the commit fails, and nothing is written when
//! validation fails.

use crate::aggregator::{group_demand, plan_generation, plan_manual_batch};
use crate::config::EngineConfig;
use crate::deriver::{ResolvedRecipe, resolve_recipe};
use crate::environment::ProductionEnvironment;
use crate::error::{ProductionError, Result};
use crate::lifecycle::{
    plan_delete, plan_merge, plan_split, plan_stage_change, plan_update, validate_split,
};
use crate::prep_list::{AggregatedPrepItem, aggregate};
use crate::types::{
    BatchDetail, BatchUpdate, NewBatch, Plan, ProvenanceReport, SplitOutcome, TimelineDay,
};
use bakehouse_core::event::{BatchEvent, EventEnvelope};
use bakehouse_core::types::{
    Batch, BatchId, BatchSource, BatchStage, DateRange, PrepItem, PrepItemId, RecipeId, StoreId,
};
use chrono::NaiveDate;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Most urgent first: priority descending, then oldest first.
fn by_urgency(a: &Batch, b: &Batch) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Production batch scheduling and aggregation engine.
///
/// # Example
///
/// ```
/// use bakehouse_core::{BatchStage, Decimal, OrderStatus, StoreId};
/// use bakehouse_production::{BatchService, EngineConfig, ProductionEnvironment};
/// use bakehouse_testing::{
///     InMemoryBatchStore, MockOrderSource, MockRecipeSource, RecordingEventPublisher,
///     fixtures, test_clock,
/// };
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let store_id = StoreId::new();
/// let recipes = MockRecipeSource::new();
/// let orders = MockOrderSource::new();
/// let recipe = fixtures::recipe("Baguette", &[("Flour", "g", "250")]);
/// recipes.insert(store_id, recipe.clone());
/// let day = fixtures::production_date();
/// orders.insert(store_id, fixtures::order(OrderStatus::Received, day, &[(recipe.id, 5)]));
/// orders.insert(store_id, fixtures::order(OrderStatus::InProgress, day, &[(recipe.id, 3)]));
///
/// let service = BatchService::new(
///     ProductionEnvironment::new(
///         Arc::new(InMemoryBatchStore::new()),
///         Arc::new(recipes),
///         Arc::new(orders),
///         Arc::new(RecordingEventPublisher::new()),
///         Arc::new(test_clock()),
///     ),
///     EngineConfig::default(),
/// );
///
/// let batches = service.generate_batches(store_id, day).await.unwrap();
/// assert_eq!(batches.len(), 1);
/// assert_eq!(batches[0].quantity, Decimal::from(8));
///
/// let packaged = service
///     .update_stage(store_id, batches[0].id, BatchStage::Packaged)
///     .await
///     .unwrap();
/// assert_eq!(packaged.stage, BatchStage::Packaged);
/// # });
/// ```
#[derive(Clone)]
pub struct BatchService {
    env: ProductionEnvironment,
    config: EngineConfig,
}

impl BatchService {
    /// Create a service over its collaborators
    #[must_use]
    pub const fn new(env: ProductionEnvironment, config: EngineConfig) -> Self {
        Self { env, config }
    }

    /// Engine configuration in use
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════
    // Aggregation
    // ═══════════════════════════════════════════════════════════

    /// Create one `auto` batch per recipe demanded by eligible orders due on `date`.
    ///
    /// Returns an empty list, writing nothing, when no eligible order has a
    /// positive line. Repeated calls create new batches each time.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::OrderSource`] if orders cannot be fetched
    /// - [`ProductionError::Validation`] if a derived prep quantity overflows
    /// - [`ProductionError::Store`] if the commit fails
    #[tracing::instrument(skip(self))]
    pub async fn generate_batches(&self, store_id: StoreId, date: NaiveDate) -> Result<Vec<Batch>> {
        let orders = self
            .env
            .orders
            .find_orders_by_date_range(store_id, DateRange::single_day(date))
            .await?;
        let groups = group_demand(&orders, date, &self.config);
        if groups.is_empty() {
            info!(orders = orders.len(), "No eligible demand, nothing to generate");
            return Ok(Vec::new());
        }

        let recipes = join_all(
            groups
                .iter()
                .map(|group| self.resolve(store_id, group.recipe_id)),
        )
        .await;
        let demand = groups.into_iter().zip(recipes).collect();

        let plan = plan_generation(
            store_id,
            date,
            demand,
            self.env.clock.now(),
            self.config.prep_quantity_scale,
        )?;
        let batches = self.execute(store_id, plan).await?;

        metrics::counter!("production.batches.created", "source" => BatchSource::Auto.as_str())
            .increment(batches.len() as u64);
        info!(count = batches.len(), "Generated batches from orders");
        Ok(batches)
    }

    /// Create a `manual` batch.
    ///
    /// The recipe is looked up for its bill of materials, and for its name
    /// when the request carries none. A failed lookup still creates the batch.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::Validation`] if the quantity is not positive
    /// - [`ProductionError::Store`] if the commit fails
    #[tracing::instrument(skip(self, request), fields(recipe_id = %request.recipe_id))]
    pub async fn create_batch(&self, store_id: StoreId, request: NewBatch) -> Result<Batch> {
        if request.quantity <= Decimal::ZERO {
            return Err(ProductionError::validation(format!(
                "Batch quantity must be positive, got {}",
                request.quantity
            )));
        }

        let recipe = self.resolve(store_id, request.recipe_id).await;
        let plan = plan_manual_batch(
            store_id,
            request,
            &recipe,
            self.env.clock.now(),
            self.config.prep_quantity_scale,
        )?;
        let batch = self.execute(store_id, plan).await?;

        metrics::counter!("production.batches.created", "source" => BatchSource::Manual.as_str())
            .increment(1);
        info!(batch_id = %batch.id, quantity = %batch.quantity, "Created batch");
        Ok(batch)
    }

    // ═══════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════

    /// Set a batch's stage.
    ///
    /// Publishes `BATCH_STAGE_CHANGED`, then `BATCH_COMPLETED` when the new
    /// stage is `PACKAGED`.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::NotFound`] if the batch does not exist
    /// - [`ProductionError::Conflict`] if the batch changed concurrently
    #[tracing::instrument(skip(self))]
    pub async fn update_stage(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
        stage: BatchStage,
    ) -> Result<Batch> {
        let batch = self.load_batch(store_id, batch_id).await?;
        let previous = batch.stage;
        let plan = plan_stage_change(&batch, stage, self.env.clock.now());
        let updated = self.execute(store_id, plan).await?;

        metrics::counter!("production.stage.changed", "stage" => stage.as_str()).increment(1);
        info!(%batch_id, %previous, %stage, "Batch stage updated");
        Ok(updated)
    }

    /// Split `split_quantity` units off a batch into a new batch.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::NotFound`] if the batch does not exist
    /// - [`ProductionError::Validation`] unless `0 < split_quantity < quantity`
    /// - [`ProductionError::Conflict`] if the batch changed concurrently
    #[tracing::instrument(skip(self))]
    pub async fn split_batch(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
        split_quantity: Decimal,
    ) -> Result<SplitOutcome> {
        let original = self.load_batch(store_id, batch_id).await?;
        validate_split(&original, split_quantity)?;

        let recipe = self.resolve(store_id, original.recipe_id).await;
        let plan = plan_split(
            &original,
            split_quantity,
            &recipe,
            self.env.clock.now(),
            self.config.prep_quantity_scale,
        )?;
        let outcome = self.execute(store_id, plan).await?;

        metrics::counter!("production.batches.split").increment(1);
        info!(
            %batch_id,
            new_batch_id = %outcome.new_batch.id,
            remaining = %outcome.original.quantity,
            split = %split_quantity,
            "Split batch"
        );
        Ok(outcome)
    }

    /// Merge batches of the same recipe and date into a new batch, deleting
    /// the originals.
    ///
    /// `batch_ids` order matters: the first batch supplies assignee, source
    /// and recipe name.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::Validation`] if the list is empty, repeats an id,
    ///   or mixes recipes or dates
    /// - [`ProductionError::NotFound`] for the first id that does not exist
    /// - [`ProductionError::Conflict`] if any input changed concurrently
    #[tracing::instrument(skip(self))]
    pub async fn merge_batches(&self, store_id: StoreId, batch_ids: &[BatchId]) -> Result<Batch> {
        let Some((&first_id, rest)) = batch_ids.split_first() else {
            return Err(ProductionError::validation("Merge needs at least one batch"));
        };

        let first = self.load_batch(store_id, first_id).await?;
        let recipe_id = first.recipe_id;
        let mut inputs = Vec::with_capacity(batch_ids.len());
        inputs.push(first);
        for &id in rest {
            inputs.push(self.load_batch(store_id, id).await?);
        }

        let recipe = self.resolve(store_id, recipe_id).await;
        let plan = plan_merge(
            &inputs,
            &recipe,
            self.env.clock.now(),
            self.config.prep_quantity_scale,
        )?;
        let merged = self.execute(store_id, plan).await?;

        metrics::counter!("production.batches.merged").increment(1);
        metrics::counter!("production.batches.deleted").increment(inputs.len() as u64);
        info!(
            merged_batch_id = %merged.id,
            inputs = inputs.len(),
            quantity = %merged.quantity,
            stage = %merged.stage,
            "Merged batches"
        );
        Ok(merged)
    }

    /// Edit a batch's quantity, priority, assignee, notes or date.
    ///
    /// A quantity change replaces the batch's prep items with a fresh
    /// derivation, unless the recipe cannot be looked up, in which case the
    /// existing prep items stay. Order contributions are left as they are.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::NotFound`] if the batch does not exist
    /// - [`ProductionError::Validation`] if the update is empty or the
    ///   quantity not positive
    /// - [`ProductionError::Conflict`] if the batch changed concurrently
    #[tracing::instrument(skip(self))]
    pub async fn update_batch(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
        update: BatchUpdate,
    ) -> Result<Batch> {
        let batch = self.load_batch(store_id, batch_id).await?;
        let recipe = if update.changes_quantity(&batch) {
            self.resolve(store_id, batch.recipe_id).await
        } else {
            ResolvedRecipe::default()
        };

        let plan = plan_update(
            &batch,
            update,
            &recipe,
            self.env.clock.now(),
            self.config.prep_quantity_scale,
        )?;
        let updated = self.execute(store_id, plan).await?;

        info!(%batch_id, version = %updated.version, "Updated batch");
        Ok(updated)
    }

    /// Delete a batch with its order contributions and prep items.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::NotFound`] if the batch does not exist
    /// - [`ProductionError::Conflict`] if the batch changed concurrently
    #[tracing::instrument(skip(self))]
    pub async fn delete_batch(&self, store_id: StoreId, batch_id: BatchId) -> Result<()> {
        let batch = self.load_batch(store_id, batch_id).await?;
        self.execute(store_id, plan_delete(&batch)).await?;

        metrics::counter!("production.batches.deleted").increment(1);
        info!(%batch_id, "Deleted batch");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════

    /// Load a batch with its contributions and prep items.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::NotFound`] if the batch does not exist
    /// - [`ProductionError::Store`] if a read fails
    pub async fn get_batch(&self, store_id: StoreId, batch_id: BatchId) -> Result<BatchDetail> {
        let batch = self.load_batch(store_id, batch_id).await?;
        let contributions = self.env.store.order_contributions(store_id, batch_id).await?;
        let prep_items = self.env.store.prep_items(store_id, batch_id).await?;
        Ok(BatchDetail {
            batch,
            contributions,
            prep_items,
        })
    }

    /// Batches scheduled on `date`, most urgent first.
    ///
    /// # Errors
    ///
    /// Returns [`ProductionError::Store`] if the read fails.
    pub async fn list_batches(&self, store_id: StoreId, date: NaiveDate) -> Result<Vec<Batch>> {
        let mut batches = self.env.store.find_batches_by_date(store_id, date).await?;
        batches.sort_by(by_urgency);
        Ok(batches)
    }

    /// Batches between `from` and `to` inclusive, grouped per day in date order.
    ///
    /// Days without batches are omitted.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::Validation`] if `from > to` or the range is longer
    ///   than the configured maximum
    /// - [`ProductionError::Store`] if the read fails
    #[tracing::instrument(skip(self))]
    pub async fn get_timeline(
        &self,
        store_id: StoreId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimelineDay>> {
        let range = DateRange::new(from, to).ok_or_else(|| {
            ProductionError::validation(format!("Timeline start {from} is after end {to}"))
        })?;
        let max_days = self.config.max_timeline_days;
        if range.days() > i64::from(max_days) {
            return Err(ProductionError::validation(format!(
                "Timeline spans {} days, at most {max_days} allowed",
                range.days()
            )));
        }

        let mut days: BTreeMap<NaiveDate, Vec<Batch>> = BTreeMap::new();
        for batch in self.env.store.find_batches_in_range(store_id, range).await? {
            days.entry(batch.production_date).or_default().push(batch);
        }

        Ok(days
            .into_iter()
            .map(|(date, mut batches)| {
                batches.sort_by(by_urgency);
                TimelineDay { date, batches }
            })
            .collect())
    }

    /// Consolidated prep list for every batch scheduled on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ProductionError::Store`] if the read fails.
    pub async fn get_prep_list(
        &self,
        store_id: StoreId,
        date: NaiveDate,
    ) -> Result<Vec<AggregatedPrepItem>> {
        let items = self.env.store.prep_items_by_date(store_id, date).await?;
        Ok(aggregate(&items))
    }

    /// Set a prep item's checklist flag. Nothing else changes.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::NotFound`] if the prep item does not exist
    /// - [`ProductionError::Store`] if the write fails
    #[tracing::instrument(skip(self))]
    pub async fn toggle_prep_item(
        &self,
        store_id: StoreId,
        prep_item_id: PrepItemId,
        is_prepped: bool,
    ) -> Result<PrepItem> {
        let item = self
            .env
            .store
            .set_prep_item_prepped(store_id, prep_item_id, is_prepped)
            .await?
            .ok_or_else(|| ProductionError::prep_item_not_found(prep_item_id))?;
        debug!(%prep_item_id, is_prepped, "Prep item toggled");
        Ok(item)
    }

    /// Compare a batch's quantity with the order lines recorded against it.
    ///
    /// # Errors
    ///
    /// - [`ProductionError::NotFound`] if the batch does not exist
    /// - [`ProductionError::Store`] if a read fails
    pub async fn check_provenance(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Result<ProvenanceReport> {
        let batch = self.load_batch(store_id, batch_id).await?;
        let contributions = self.env.store.order_contributions(store_id, batch_id).await?;
        Ok(ProvenanceReport::new(&batch, &contributions))
    }

    // ═══════════════════════════════════════════════════════════
    // Shell plumbing
    // ═══════════════════════════════════════════════════════════

    async fn load_batch(&self, store_id: StoreId, batch_id: BatchId) -> Result<Batch> {
        self.env
            .store
            .find_batch(store_id, batch_id)
            .await?
            .ok_or_else(|| ProductionError::batch_not_found(batch_id))
    }

    async fn resolve(&self, store_id: StoreId, recipe_id: RecipeId) -> ResolvedRecipe {
        resolve_recipe(self.env.recipes.get_recipe(store_id, recipe_id).await)
    }

    /// Commit a plan, then publish its events.
    async fn execute<T>(&self, store_id: StoreId, plan: Plan<T>) -> Result<T> {
        let Plan {
            output,
            changes,
            events,
        } = plan;

        if !changes.is_empty() {
            let mutations = changes.len();
            self.env.store.commit(store_id, changes).await?;
            debug!(mutations, "Committed change set");
        }
        self.publish_all(store_id, events).await;
        Ok(output)
    }

    async fn publish_all(&self, store_id: StoreId, events: Vec<BatchEvent>) {
        for event in events {
            let envelope = EventEnvelope::new(store_id, event, self.env.clock.now());
            let event_name = envelope.event_name();
            if let Err(error) = self.env.events.publish(envelope).await {
                metrics::counter!("production.events.publish_failed", "event" => event_name)
                    .increment(1);
                warn!(event_name, %error, "Failed to publish batch event");
            }
        }
    }
}
