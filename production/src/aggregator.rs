//! Batch aggregation: turning order demand into batches.
//!
//! # Algorithm
//!
//! 1. Keep orders due on the production date in an eligible status
//! 2. Walk their lines, grouping by recipe and remembering each line's
//!    `(order, index, quantity)` provenance
//! 3. Plan one auto batch per recipe group with one contribution per line
//!    and prep items derived from the recipe
//!
//! Generation is additive: nothing here looks at batches that already exist
//! for the date.

use crate::config::EngineConfig;
use crate::deriver::{ResolvedRecipe, derive_prep_items};
use crate::error::{ProductionError, Result};
use crate::types::{NewBatch, Plan};
use bakehouse_core::changeset::ChangeSet;
use bakehouse_core::event::BatchEvent;
use bakehouse_core::types::{
    Batch, BatchId, BatchSource, BatchStage, ContributionId, Order, OrderContribution, OrderId,
    RecipeId, StoreId, Version,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// One order line folded into a recipe group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DemandLine {
    /// Order the line belongs to
    pub order_id: OrderId,
    /// Position of the line in the order
    pub item_index: u32,
    /// Units requested
    pub quantity: Decimal,
}

/// Total demand for one recipe on one day
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipeDemand {
    /// Recipe demanded
    pub recipe_id: RecipeId,
    /// Sum of all line quantities
    pub total_quantity: Decimal,
    /// Contributing lines in order of appearance
    pub lines: Vec<DemandLine>,
}

/// Group eligible order lines due on `date` by recipe.
///
/// Groups come out in order of the first line that mentions each recipe.
/// Lines with a non-positive quantity are skipped, as are lines that would
/// push their group's total past what a [`Decimal`] can hold.
#[must_use]
pub fn group_demand(orders: &[Order], date: NaiveDate, config: &EngineConfig) -> Vec<RecipeDemand> {
    let mut groups: Vec<RecipeDemand> = Vec::new();

    let eligible = orders
        .iter()
        .filter(|order| order.due_date == date && config.is_eligible(order.status));

    for order in eligible {
        for (item, item_index) in order.items.iter().zip(0_u32..) {
            if item.quantity <= Decimal::ZERO {
                tracing::debug!(
                    order_id = %order.id,
                    item_index,
                    quantity = %item.quantity,
                    "Skipping order line without positive quantity"
                );
                continue;
            }

            let line = DemandLine {
                order_id: order.id,
                item_index,
                quantity: item.quantity,
            };
            match groups.iter_mut().find(|g| g.recipe_id == item.recipe_id) {
                Some(group) => {
                    let Some(total) = group.total_quantity.checked_add(item.quantity) else {
                        tracing::warn!(
                            order_id = %order.id,
                            item_index,
                            recipe_id = %item.recipe_id,
                            "Skipping order line that overflows the recipe total"
                        );
                        metrics::counter!("production.order_lines.overflowed").increment(1);
                        continue;
                    };
                    group.total_quantity = total;
                    group.lines.push(line);
                }
                None => groups.push(RecipeDemand {
                    recipe_id: item.recipe_id,
                    total_quantity: item.quantity,
                    lines: vec![line],
                }),
            }
        }
    }

    groups
}

/// Event announcing a freshly inserted batch
#[must_use]
pub const fn created_event(batch: &Batch) -> BatchEvent {
    BatchEvent::Created {
        batch_id: batch.id,
        recipe_id: batch.recipe_id,
    }
}

/// A new `TO_PREP`, priority 0 batch at version 1
pub(crate) fn fresh_batch(
    store_id: StoreId,
    recipe_id: RecipeId,
    recipe_name: String,
    quantity: Decimal,
    production_date: NaiveDate,
    source: BatchSource,
    now: DateTime<Utc>,
) -> Batch {
    Batch {
        id: BatchId::new(),
        store_id,
        recipe_id,
        recipe_name,
        quantity,
        stage: BatchStage::ToPrep,
        production_date,
        priority: 0,
        assigned_to: None,
        source,
        notes: None,
        version: Version::initial(),
        created_at: now,
        updated_at: now,
    }
}

/// Plan the batches for a day's grouped demand.
///
/// Each group is paired with its resolved recipe. Every batch is `auto`,
/// priority 0, with one contribution per demand line, so contributions sum to
/// the batch quantity.
///
/// # Errors
///
/// Returns [`ProductionError::Validation`] if a derived prep quantity
/// overflows.
pub fn plan_generation(
    store_id: StoreId,
    date: NaiveDate,
    demand: Vec<(RecipeDemand, ResolvedRecipe)>,
    now: DateTime<Utc>,
    scale: u32,
) -> Result<Plan<Vec<Batch>>> {
    let mut changes = ChangeSet::new();
    let mut events = Vec::with_capacity(demand.len());
    let mut batches = Vec::with_capacity(demand.len());

    for (group, recipe) in demand {
        let batch = fresh_batch(
            store_id,
            group.recipe_id,
            recipe.name,
            group.total_quantity,
            date,
            BatchSource::Auto,
            now,
        );

        let contributions = group.lines.into_iter().map(|line| OrderContribution {
            id: ContributionId::new(),
            batch_id: batch.id,
            order_id: line.order_id,
            order_item_index: line.item_index,
            quantity_from_order: line.quantity,
        });
        let prep_items = derive_prep_items(&batch, &recipe.ingredients, scale)?;

        changes
            .insert_batch(batch.clone())
            .insert_contributions(contributions)
            .insert_prep_items(prep_items);
        events.push(created_event(&batch));
        batches.push(batch);
    }

    Ok(Plan::new(batches, changes, events))
}

/// Plan a manually requested batch.
///
/// The request's `recipe_name` wins over the resolved name when given.
///
/// # Errors
///
/// Returns [`ProductionError::Validation`] if the quantity is not positive
/// or a derived prep quantity overflows.
pub fn plan_manual_batch(
    store_id: StoreId,
    request: NewBatch,
    recipe: &ResolvedRecipe,
    now: DateTime<Utc>,
    scale: u32,
) -> Result<Plan<Batch>> {
    if request.quantity <= Decimal::ZERO {
        return Err(ProductionError::validation(format!(
            "Batch quantity must be positive, got {}",
            request.quantity
        )));
    }

    let mut batch = fresh_batch(
        store_id,
        request.recipe_id,
        request.recipe_name.unwrap_or_else(|| recipe.name.clone()),
        request.quantity,
        request.production_date,
        BatchSource::Manual,
        now,
    );
    batch.priority = request.priority;
    batch.assigned_to = request.assigned_to;
    batch.notes = request.notes;

    let mut changes = ChangeSet::new();
    changes
        .insert_batch(batch.clone())
        .insert_prep_items(derive_prep_items(&batch, &recipe.ingredients, scale)?);
    let events = vec![created_event(&batch)];

    Ok(Plan::new(batch, changes, events))
}
