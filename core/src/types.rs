//! Domain types for production scheduling.
//!
//! Identifiers, the three store-owned entities (batches, order contributions,
//! prep items) and the order/recipe shapes handed over by the external sources.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Creates a `", stringify!($name), "` from a UUID")]
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Tenant partition key. Every entity belongs to exactly one store.
    StoreId
);
uuid_id!(
    /// Unique identifier for a production batch
    BatchId
);
uuid_id!(
    /// Identifier of a recipe in the recipe source
    RecipeId
);
uuid_id!(
    /// Identifier of a customer order in the order source
    OrderId
);
uuid_id!(
    /// Identifier of an ingredient referenced by a bill of materials
    IngredientId
);
uuid_id!(
    /// Unique identifier for a prep item
    PrepItemId
);
uuid_id!(
    /// Row identity of an order contribution
    ContributionId
);
uuid_id!(
    /// Reference to the kitchen operator a batch is assigned to
    OperatorId
);

/// Optimistic concurrency version of a batch row.
///
/// Starts at 1 when a batch is inserted and increases by one on every
/// committed mutation of that batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Creates a version from its raw value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Version assigned to a freshly inserted batch
    #[must_use]
    pub const fn initial() -> Self {
        Self(1)
    }

    /// The version following this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw version number
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Error returned when a stage name or ordinal is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid batch stage: {0}")]
pub struct ParseStageError(pub String);

/// Position of a batch in the manufacturing pipeline.
///
/// Stages are ordered by ordinal (`TO_PREP` = 0 … `PACKAGED` = 3). The order is
/// a convention only; any stage may be set from any other.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStage {
    /// Waiting for ingredients to be weighed out (initial stage)
    #[default]
    ToPrep,
    /// Dough or batter is being mixed
    Mixing,
    /// Baked/finished and ready to pack
    Ready,
    /// Packed; terminal for workflow purposes
    Packaged,
}

impl BatchStage {
    /// All stages in pipeline order
    pub const ALL: [Self; 4] = [Self::ToPrep, Self::Mixing, Self::Ready, Self::Packaged];

    /// Ordinal of the stage (0-based)
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::ToPrep => 0,
            Self::Mixing => 1,
            Self::Ready => 2,
            Self::Packaged => 3,
        }
    }

    /// Stage for an ordinal, if one exists
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::ToPrep),
            1 => Some(Self::Mixing),
            2 => Some(Self::Ready),
            3 => Some(Self::Packaged),
            _ => None,
        }
    }

    /// Whether this is the stage every batch starts in
    #[must_use]
    pub const fn is_initial(self) -> bool {
        matches!(self, Self::ToPrep)
    }

    /// Whether this stage completes the batch
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Packaged)
    }

    /// Wire name of the stage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToPrep => "TO_PREP",
            Self::Mixing => "MIXING",
            Self::Ready => "READY",
            Self::Packaged => "PACKAGED",
        }
    }
}

impl fmt::Display for BatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStageError(s.to_string()))
    }
}

/// How a batch came into existence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchSource {
    /// Created directly by a user
    Manual,
    /// Generated from order demand
    Auto,
}

impl BatchSource {
    /// Wire name of the source
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for BatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            other => Err(format!("Invalid batch source: {other}")),
        }
    }
}

/// A unit of manufacturing work: one recipe, one date, one quantity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    /// Batch identifier
    pub id: BatchId,
    /// Owning store (tenant)
    pub store_id: StoreId,
    /// Recipe being produced
    pub recipe_id: RecipeId,
    /// Recipe name snapshot; empty when the recipe could not be resolved
    pub recipe_name: String,
    /// Number of output units, always positive
    pub quantity: Decimal,
    /// Pipeline stage
    pub stage: BatchStage,
    /// Calendar day the batch is produced on
    pub production_date: NaiveDate,
    /// Higher is more urgent
    pub priority: i32,
    /// Operator responsible for the batch
    pub assigned_to: Option<OperatorId>,
    /// Manual or generated from orders
    pub source: BatchSource,
    /// Free-text notes
    pub notes: Option<String>,
    /// Optimistic concurrency version
    pub version: Version,
    /// When the batch was created
    pub created_at: DateTime<Utc>,
    /// When the batch was last modified
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Returns `true` if the notes field carries non-blank text
    #[must_use]
    pub fn has_notes(&self) -> bool {
        self.notes.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

// ============================================================================
// Order contributions and prep items
// ============================================================================

/// Provenance edge: a specific order line funded part of a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderContribution {
    /// Row identity
    pub id: ContributionId,
    /// Batch the demand was folded into
    pub batch_id: BatchId,
    /// Order the demand came from
    pub order_id: OrderId,
    /// Position of the line within the order's item list
    pub order_item_index: u32,
    /// Quantity this line contributed
    pub quantity_from_order: Decimal,
}

impl OrderContribution {
    /// The `(order, line, quantity)` triple that identifies this contribution's provenance
    #[must_use]
    pub const fn provenance(&self) -> (OrderId, u32, Decimal) {
        (self.order_id, self.order_item_index, self.quantity_from_order)
    }
}

/// A derived ingredient requirement for one batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepItem {
    /// Prep item identifier
    pub id: PrepItemId,
    /// Owning batch
    pub batch_id: BatchId,
    /// Ingredient required
    pub ingredient_id: IngredientId,
    /// Ingredient name snapshot
    pub ingredient_name: String,
    /// Bill-of-materials quantity scaled by batch quantity
    pub required_quantity: Decimal,
    /// Unit of measure
    pub unit: String,
    /// Checklist flag toggled by kitchen staff
    pub is_prepped: bool,
}

// ============================================================================
// Orders (read from the order source)
// ============================================================================

/// Error returned when an order status name is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid order status: {0}")]
pub struct ParseOrderStatusError(pub String);

/// Lifecycle status of a customer order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted, not yet started
    Received,
    /// Being worked on
    InProgress,
    /// Finished and awaiting pickup/delivery
    Ready,
    /// Handed to the customer
    Delivered,
    /// Cancelled by the customer or the store
    Cancelled,
}

impl OrderStatus {
    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::InProgress => "in_progress",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "received" => Ok(Self::Received),
            "in_progress" => Ok(Self::InProgress),
            "ready" => Ok(Self::Ready),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ParseOrderStatusError(s.to_string())),
        }
    }
}

/// One line of a customer order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Recipe ordered
    pub recipe_id: RecipeId,
    /// Units ordered
    pub quantity: Decimal,
}

/// A customer order as returned by the order source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Current status
    pub status: OrderStatus,
    /// Day the order is due
    pub due_date: NaiveDate,
    /// Order lines; their position is their index
    pub items: Vec<OrderItem>,
}

/// Inclusive range of calendar days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// Creates a range, or `None` when `from` is after `to`
    #[must_use]
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    /// A range covering exactly one day
    #[must_use]
    pub const fn single_day(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }

    /// First day of the range
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.from
    }

    /// Last day of the range
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.to
    }

    /// Whether `date` falls inside the range
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Number of days covered, counting both ends
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

// ============================================================================
// Recipes (read from the recipe source)
// ============================================================================

/// One ingredient line of a recipe's bill of materials
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillOfMaterialsEntry {
    /// Ingredient required
    pub ingredient_id: IngredientId,
    /// Ingredient display name
    pub name: String,
    /// Unit of measure
    pub unit: String,
    /// Amount needed per output unit of the recipe
    pub quantity_per_output_unit: Decimal,
}

/// A recipe with its ordered bill of materials
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Recipe identifier
    pub id: RecipeId,
    /// Display name
    pub name: String,
    /// Ingredient lines, in recipe order
    pub ingredients: Vec<BillOfMaterialsEntry>,
}
