//! Fixture builders for tests.
//!
//! Builders panic on malformed literals; they are only meant for test code.

#![allow(clippy::expect_used)]
#![allow(clippy::missing_panics_doc)]

use bakehouse_core::types::{
    Batch, BatchId, BatchSource, BatchStage, BillOfMaterialsEntry, IngredientId, Order, OrderId,
    OrderItem, OrderStatus, PrepItem, PrepItemId, Recipe, RecipeId, StoreId, Version,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Parse a decimal literal such as `"0.3"`
#[must_use]
pub fn quantity(literal: &str) -> Decimal {
    literal
        .parse()
        .expect("fixture quantities are valid decimal literals")
}

/// Default production date used across tests (2025-01-02)
#[must_use]
pub fn production_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid fixture date")
}

/// Timestamp matching [`crate::test_clock`]
#[must_use]
pub fn timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
        .expect("valid fixture timestamp")
        .with_timezone(&Utc)
}

/// A manual `TO_PREP` batch of an arbitrary recipe on [`production_date`]
#[must_use]
pub fn batch(store_id: StoreId, quantity: Decimal) -> Batch {
    Batch {
        id: BatchId::new(),
        store_id,
        recipe_id: RecipeId::new(),
        recipe_name: "Sourdough".to_string(),
        quantity,
        stage: BatchStage::ToPrep,
        production_date: production_date(),
        priority: 0,
        assigned_to: None,
        source: BatchSource::Manual,
        notes: None,
        version: Version::initial(),
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

/// An unprepped prep item measured in grams
#[must_use]
pub fn prep_item(batch_id: BatchId, name: &str, required_quantity: Decimal) -> PrepItem {
    PrepItem {
        id: PrepItemId::new(),
        batch_id,
        ingredient_id: IngredientId::new(),
        ingredient_name: name.to_string(),
        required_quantity,
        unit: "g".to_string(),
        is_prepped: false,
    }
}

/// A recipe whose bill of materials is `(name, unit, quantity per unit)` triples
#[must_use]
pub fn recipe(name: &str, ingredients: &[(&str, &str, &str)]) -> Recipe {
    Recipe {
        id: RecipeId::new(),
        name: name.to_string(),
        ingredients: ingredients
            .iter()
            .map(|(ingredient, unit, per_unit)| BillOfMaterialsEntry {
                ingredient_id: IngredientId::new(),
                name: (*ingredient).to_string(),
                unit: (*unit).to_string(),
                quantity_per_output_unit: quantity(per_unit),
            })
            .collect(),
    }
}

/// An order due on `due_date` with `(recipe, quantity)` lines
#[must_use]
pub fn order(status: OrderStatus, due_date: NaiveDate, items: &[(RecipeId, i64)]) -> Order {
    Order {
        id: OrderId::new(),
        status,
        due_date,
        items: items
            .iter()
            .map(|&(recipe_id, qty)| OrderItem {
                recipe_id,
                quantity: Decimal::from(qty),
            })
            .collect(),
    }
}
