//! Batch lifecycle: stage changes and reorganisation.
//!
//! # Stage machine
//!
//! ```text
//! TO_PREP (0) → MIXING (1) → READY (2) → PACKAGED (3)
//! ```
//!
//! The order is a convention. Any stage may be set from any other, and every
//! stage update publishes exactly one `BATCH_STAGE_CHANGED`, followed by
//! `BATCH_COMPLETED` when the new stage is `PACKAGED`.
//!
//! # Conservation
//!
//! - Split: `original.quantity_after + new.quantity == original.quantity_before`
//! - Merge: `merged.quantity == Σ inputs.quantity`, and the merged batch owns
//!   exactly the union of the inputs' order contributions
//!
//! Every plan guards the batches it read with their version, so a split and a
//! merge racing on the same batch cannot both commit.

use crate::aggregator::{created_event, fresh_batch};
use crate::deriver::{ResolvedRecipe, derive_prep_items};
use crate::error::{ProductionError, Result};
use crate::types::{BatchUpdate, Plan, SplitOutcome};
use bakehouse_core::changeset::ChangeSet;
use bakehouse_core::event::BatchEvent;
use bakehouse_core::types::{Batch, BatchId, BatchStage};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Events published for a stage update of `batch_id`.
#[must_use]
pub fn stage_events(batch_id: BatchId, previous: BatchStage, new: BatchStage) -> Vec<BatchEvent> {
    let mut events = vec![BatchEvent::StageChanged {
        batch_id,
        previous_stage: previous,
        new_stage: new,
    }];
    if new.is_terminal() {
        events.push(BatchEvent::Completed { batch_id });
    }
    events
}

/// Events for a batch born directly into `stage`: creation, then the stage
/// transition from `TO_PREP` when `stage` is not the initial one.
fn birth_events(batch: &Batch) -> Vec<BatchEvent> {
    let mut events = vec![created_event(batch)];
    if !batch.stage.is_initial() {
        events.extend(stage_events(batch.id, BatchStage::ToPrep, batch.stage));
    }
    events
}

/// The next revision of `batch`, stamped at `now`
fn revise(batch: &Batch, now: DateTime<Utc>) -> Batch {
    Batch {
        version: batch.version.next(),
        updated_at: now,
        ..batch.clone()
    }
}

/// Plan setting a batch's stage.
///
/// The stage is set unconditionally, even when it equals the current one.
#[must_use]
pub fn plan_stage_change(batch: &Batch, new_stage: BatchStage, now: DateTime<Utc>) -> Plan<Batch> {
    let mut updated = revise(batch, now);
    updated.stage = new_stage;

    let mut changes = ChangeSet::new();
    changes.update_batch(updated.clone(), batch.version);
    let events = stage_events(batch.id, batch.stage, new_stage);

    Plan::new(updated, changes, events)
}

/// Check that `0 < split_quantity < original.quantity`.
///
/// # Errors
///
/// Returns [`ProductionError::Validation`] when the quantity is out of range.
pub fn validate_split(original: &Batch, split_quantity: Decimal) -> Result<()> {
    if split_quantity <= Decimal::ZERO || split_quantity >= original.quantity {
        return Err(ProductionError::validation(format!(
            "Split quantity must be greater than 0 and less than {}, got {split_quantity}",
            original.quantity
        )));
    }
    Ok(())
}

/// Plan splitting `split_quantity` units off a batch.
///
/// The new batch copies recipe, date, priority, assignee, source and notes,
/// and the stage when it is past `TO_PREP`. It gets fresh prep items; the
/// original keeps its prep items and all of its order contributions.
///
/// # Errors
///
/// Returns [`ProductionError::Validation`] unless
/// `0 < split_quantity < original.quantity`, or if a derived prep quantity
/// overflows.
pub fn plan_split(
    original: &Batch,
    split_quantity: Decimal,
    recipe: &ResolvedRecipe,
    now: DateTime<Utc>,
    scale: u32,
) -> Result<Plan<SplitOutcome>> {
    validate_split(original, split_quantity)?;

    let mut reduced = revise(original, now);
    reduced.quantity -= split_quantity;

    let mut new_batch = fresh_batch(
        original.store_id,
        original.recipe_id,
        original.recipe_name.clone(),
        split_quantity,
        original.production_date,
        original.source,
        now,
    );
    new_batch.priority = original.priority;
    new_batch.assigned_to = original.assigned_to;
    new_batch.notes.clone_from(&original.notes);
    if !original.stage.is_initial() {
        new_batch.stage = original.stage;
    }

    let mut changes = ChangeSet::new();
    changes
        .update_batch(reduced.clone(), original.version)
        .insert_batch(new_batch.clone())
        .insert_prep_items(derive_prep_items(&new_batch, &recipe.ingredients, scale)?);
    let events = birth_events(&new_batch);

    Ok(Plan::new(
        SplitOutcome {
            original: reduced,
            new_batch,
        },
        changes,
        events,
    ))
}

/// Plan merging `inputs` into one new batch.
///
/// Inputs are authoritative in the order given: the first supplies assignee,
/// source and (when not empty) the recipe name snapshot. The merged batch
/// sums the quantities, takes the highest priority and the lowest stage, and
/// joins non-blank notes with `"; "`. Contributions are re-parented before
/// the inputs are deleted.
///
/// # Errors
///
/// Returns [`ProductionError::Validation`] if `inputs` is empty, repeats a
/// batch, mixes recipes or production dates, or sums past what a [`Decimal`]
/// can hold.
pub fn plan_merge(
    inputs: &[Batch],
    recipe: &ResolvedRecipe,
    now: DateTime<Utc>,
    scale: u32,
) -> Result<Plan<Batch>> {
    let Some(first) = inputs.first() else {
        return Err(ProductionError::validation("Merge needs at least one batch"));
    };

    let mut seen = HashSet::with_capacity(inputs.len());
    if let Some(repeated) = inputs.iter().find(|b| !seen.insert(b.id)) {
        return Err(ProductionError::validation(format!(
            "Batch {} listed more than once",
            repeated.id
        )));
    }

    if let Some(mismatch) = inputs.iter().find(|b| {
        b.recipe_id != first.recipe_id || b.production_date != first.production_date
    }) {
        return Err(ProductionError::validation(format!(
            "Cannot merge batch {} ({} on {}) into batches of {} on {}",
            mismatch.id,
            mismatch.recipe_id,
            mismatch.production_date,
            first.recipe_id,
            first.production_date
        )));
    }

    let quantity = inputs
        .iter()
        .try_fold(Decimal::ZERO, |total, b| total.checked_add(b.quantity))
        .ok_or_else(|| ProductionError::validation("Merged quantity is too large"))?;

    let recipe_name = if first.recipe_name.is_empty() {
        recipe.name.clone()
    } else {
        first.recipe_name.clone()
    };
    let notes: Vec<&str> = inputs
        .iter()
        .filter(|b| b.has_notes())
        .filter_map(|b| b.notes.as_deref())
        .collect();

    let mut merged = fresh_batch(
        first.store_id,
        first.recipe_id,
        recipe_name,
        quantity,
        first.production_date,
        first.source,
        now,
    );
    merged.priority = inputs.iter().map(|b| b.priority).max().unwrap_or(first.priority);
    merged.stage = inputs.iter().map(|b| b.stage).min().unwrap_or(first.stage);
    merged.assigned_to = first.assigned_to;
    merged.notes = (!notes.is_empty()).then(|| notes.join("; "));

    let mut changes = ChangeSet::new();
    changes.insert_batch(merged.clone());
    for input in inputs {
        changes.reparent_contributions(input.id, merged.id);
    }
    changes.insert_prep_items(derive_prep_items(&merged, &recipe.ingredients, scale)?);
    for input in inputs {
        changes.delete_batch(input.id, input.version);
    }

    let mut events = birth_events(&merged);
    events.extend(inputs.iter().map(|b| BatchEvent::Deleted { batch_id: b.id }));

    Ok(Plan::new(merged, changes, events))
}

/// Plan an edit of a batch's editable fields.
///
/// `recipe` is only consulted when the quantity actually changes; the
/// batch's prep items are then replaced by a fresh derivation. A degraded
/// recipe leaves the existing prep items and their prepped flags in place.
/// Order contributions are never touched.
///
/// # Errors
///
/// Returns [`ProductionError::Validation`] if the update is empty, the new
/// quantity is not positive, or a derived prep quantity overflows.
pub fn plan_update(
    batch: &Batch,
    update: BatchUpdate,
    recipe: &ResolvedRecipe,
    now: DateTime<Utc>,
    scale: u32,
) -> Result<Plan<Batch>> {
    if update.is_empty() {
        return Err(ProductionError::validation("Update contains no changes"));
    }
    if let Some(quantity) = update.quantity.filter(|q| *q <= Decimal::ZERO) {
        return Err(ProductionError::validation(format!(
            "Batch quantity must be positive, got {quantity}"
        )));
    }

    let rederive = update.changes_quantity(batch);
    let mut updated = revise(batch, now);
    if let Some(quantity) = update.quantity {
        updated.quantity = quantity;
    }
    if let Some(priority) = update.priority {
        updated.priority = priority;
    }
    if let Some(assigned_to) = update.assigned_to {
        updated.assigned_to = assigned_to;
    }
    if let Some(notes) = update.notes {
        updated.notes = notes;
    }
    if let Some(date) = update.production_date {
        updated.production_date = date;
    }

    let mut changes = ChangeSet::new();
    changes.update_batch(updated.clone(), batch.version);
    if rederive && recipe.degraded {
        tracing::warn!(
            batch_id = %updated.id,
            quantity = %updated.quantity,
            "Recipe unavailable; keeping existing prep items"
        );
    } else if rederive {
        changes.replace_prep_items(
            updated.id,
            derive_prep_items(&updated, &recipe.ingredients, scale)?,
        );
    }

    Ok(Plan::new(updated, changes, Vec::new()))
}

/// Plan deleting a batch with everything it owns.
#[must_use]
pub fn plan_delete(batch: &Batch) -> Plan<()> {
    let mut changes = ChangeSet::new();
    changes.delete_batch(batch.id, batch.version);
    Plan::new((), changes, vec![BatchEvent::Deleted { batch_id: batch.id }])
}
