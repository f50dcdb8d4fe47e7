//! Inputs and outputs of engine operations.

use bakehouse_core::changeset::ChangeSet;
use bakehouse_core::event::BatchEvent;
use bakehouse_core::types::{
    Batch, BatchId, OperatorId, OrderContribution, PrepItem, RecipeId,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Output of a pure planner: the value to return, the writes to commit and
/// the events to publish once the commit succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan<T> {
    /// Value returned to the caller after a successful commit
    pub output: T,
    /// Writes, applied atomically
    pub changes: ChangeSet,
    /// Events, published in order after the commit
    pub events: Vec<BatchEvent>,
}

impl<T> Plan<T> {
    /// Assemble a plan
    #[must_use]
    pub const fn new(output: T, changes: ChangeSet, events: Vec<BatchEvent>) -> Self {
        Self {
            output,
            changes,
            events,
        }
    }
}

/// Request to create a batch by hand.
///
/// # Example
///
/// ```
/// use bakehouse_production::NewBatch;
/// use bakehouse_core::{Decimal, NaiveDate, RecipeId};
///
/// let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
/// let request = NewBatch::new(RecipeId::new(), Decimal::from(24), date)
///     .with_priority(2)
///     .with_notes("Extra crusty");
/// assert_eq!(request.recipe_name, None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    /// Recipe to produce
    pub recipe_id: RecipeId,
    /// Name snapshot; resolved from the recipe source when omitted
    #[serde(default)]
    pub recipe_name: Option<String>,
    /// Output units, must be positive
    pub quantity: Decimal,
    /// Day of production
    pub production_date: NaiveDate,
    /// Higher is more urgent
    #[serde(default)]
    pub priority: i32,
    /// Responsible operator
    #[serde(default)]
    pub assigned_to: Option<OperatorId>,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewBatch {
    /// Minimal request with priority 0 and no assignee or notes
    #[must_use]
    pub const fn new(recipe_id: RecipeId, quantity: Decimal, production_date: NaiveDate) -> Self {
        Self {
            recipe_id,
            recipe_name: None,
            quantity,
            production_date,
            priority: 0,
            assigned_to: None,
            notes: None,
        }
    }

    /// Use this name instead of resolving it
    #[must_use]
    pub fn with_recipe_name(mut self, name: impl Into<String>) -> Self {
        self.recipe_name = Some(name.into());
        self
    }

    /// Set the priority
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Assign an operator
    #[must_use]
    pub const fn assigned_to(mut self, operator: OperatorId) -> Self {
        self.assigned_to = Some(operator);
        self
    }

    /// Attach notes
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial edit of a batch's editable fields.
///
/// `None` leaves a field untouched. For the optional fields the inner
/// `Option` is the new value, so `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdate {
    /// New quantity, must be positive
    pub quantity: Option<Decimal>,
    /// New priority
    pub priority: Option<i32>,
    /// New assignee
    pub assigned_to: Option<Option<OperatorId>>,
    /// New notes
    pub notes: Option<Option<String>>,
    /// Move the batch to another day
    pub production_date: Option<NaiveDate>,
}

impl BatchUpdate {
    /// Empty update
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the quantity
    #[must_use]
    pub const fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Change the priority
    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Change or clear the assignee
    #[must_use]
    pub const fn assigned_to(mut self, operator: Option<OperatorId>) -> Self {
        self.assigned_to = Some(operator);
        self
    }

    /// Change or clear the notes
    #[must_use]
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    /// Move to another production date
    #[must_use]
    pub const fn production_date(mut self, date: NaiveDate) -> Self {
        self.production_date = Some(date);
        self
    }

    /// Whether no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.notes.is_none()
            && self.production_date.is_none()
    }

    /// Whether applying this update to `batch` changes its quantity
    #[must_use]
    pub fn changes_quantity(&self, batch: &Batch) -> bool {
        self.quantity.is_some_and(|q| q != batch.quantity)
    }
}

/// Result of splitting a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOutcome {
    /// The original batch with its reduced quantity
    pub original: Batch,
    /// The batch carved off it
    pub new_batch: Batch,
}

/// A batch with everything it owns
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetail {
    /// The batch
    pub batch: Batch,
    /// Order lines that funded it
    pub contributions: Vec<OrderContribution>,
    /// Derived ingredient requirements
    pub prep_items: Vec<PrepItem>,
}

/// Batches scheduled on one day of a timeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDay {
    /// Production date
    pub date: NaiveDate,
    /// Batches on that date, most urgent first
    pub batches: Vec<Batch>,
}

impl TimelineDay {
    /// Sum of batch quantities on this day
    #[must_use]
    pub fn total_quantity(&self) -> Decimal {
        self.batches
            .iter()
            .fold(Decimal::ZERO, |total, b| total.saturating_add(b.quantity))
    }
}

/// How a batch's quantity compares with the order lines recorded against it.
///
/// Contributions are authoritative only at creation time: manual batches
/// have none, and quantity edits or splits leave them untouched, so an
/// unbalanced report is informational rather than an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceReport {
    /// Batch inspected
    pub batch_id: BatchId,
    /// Current batch quantity
    pub batch_quantity: Decimal,
    /// Sum of `quantity_from_order` over its contributions
    pub contributed_quantity: Decimal,
    /// Number of contributions
    pub contribution_count: usize,
    /// Whether both quantities are equal
    pub balanced: bool,
}

impl ProvenanceReport {
    /// Build the report for a batch and its contributions
    #[must_use]
    pub fn new(batch: &Batch, contributions: &[OrderContribution]) -> Self {
        let contributed_quantity = contributions
            .iter()
            .fold(Decimal::ZERO, |total, c| total.saturating_add(c.quantity_from_order));
        Self {
            batch_id: batch.id,
            batch_quantity: batch.quantity,
            contributed_quantity,
            contribution_count: contributions.len(),
            balanced: contributed_quantity == batch.quantity,
        }
    }

    /// Batch quantity not covered by any order line (negative when over-covered)
    #[must_use]
    pub fn uncovered_quantity(&self) -> Decimal {
        self.batch_quantity - self.contributed_quantity
    }
}
