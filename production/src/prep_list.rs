//! Prep list projection.
//!
//! Folds every prep item of a day into one line per ingredient and unit, so
//! the kitchen sees "what to weigh out today" regardless of which batch needs
//! it. Each source prep item appears exactly once, as an entry of its line.

use bakehouse_core::types::{BatchId, IngredientId, PrepItem, PrepItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One batch's share of an aggregated line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepListEntry {
    /// Source prep item, used to toggle it
    pub prep_item_id: PrepItemId,
    /// Batch that needs it
    pub batch_id: BatchId,
    /// Amount needed by that batch
    pub required_quantity: Decimal,
    /// Checklist flag
    pub is_prepped: bool,
}

/// Consolidated requirement for one ingredient in one unit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPrepItem {
    /// Ingredient required
    pub ingredient_id: IngredientId,
    /// Name snapshot from the first contributing prep item
    pub ingredient_name: String,
    /// Unit of measure
    pub unit: String,
    /// Sum over all entries
    pub total_quantity: Decimal,
    /// Sum over entries already prepped
    pub prepped_quantity: Decimal,
    /// Per-batch breakdown
    pub entries: Vec<PrepListEntry>,
}

impl AggregatedPrepItem {
    /// Whether every entry is prepped
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.is_prepped)
    }

    /// Quantity still to prep
    #[must_use]
    pub fn remaining_quantity(&self) -> Decimal {
        self.total_quantity - self.prepped_quantity
    }
}

/// Aggregate a day's prep items.
///
/// Lines are grouped by `(ingredient, unit)` and sorted by ingredient name
/// (case-insensitive), then unit. A prep item id seen twice is counted once.
#[must_use]
pub fn aggregate(items: &[PrepItem]) -> Vec<AggregatedPrepItem> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut lines: Vec<AggregatedPrepItem> = Vec::new();

    for item in items.iter().filter(|item| seen.insert(item.id)) {
        let entry = PrepListEntry {
            prep_item_id: item.id,
            batch_id: item.batch_id,
            required_quantity: item.required_quantity,
            is_prepped: item.is_prepped,
        };
        let prepped = if item.is_prepped {
            item.required_quantity
        } else {
            Decimal::ZERO
        };

        match lines
            .iter_mut()
            .find(|l| l.ingredient_id == item.ingredient_id && l.unit == item.unit)
        {
            Some(line) => {
                line.total_quantity = line.total_quantity.saturating_add(item.required_quantity);
                line.prepped_quantity = line.prepped_quantity.saturating_add(prepped);
                line.entries.push(entry);
            }
            None => lines.push(AggregatedPrepItem {
                ingredient_id: item.ingredient_id,
                ingredient_name: item.ingredient_name.clone(),
                unit: item.unit.clone(),
                total_quantity: item.required_quantity,
                prepped_quantity: prepped,
                entries: vec![entry],
            }),
        }
    }

    lines.sort_by(|a, b| {
        a.ingredient_name
            .to_lowercase()
            .cmp(&b.ingredient_name.to_lowercase())
            .then_with(|| a.unit.cmp(&b.unit))
    });
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakehouse_testing::fixtures::{self, quantity};

    fn item(batch_id: BatchId, ingredient: IngredientId, name: &str, qty: &str) -> PrepItem {
        PrepItem {
            ingredient_id: ingredient,
            ..fixtures::prep_item(batch_id, name, quantity(qty))
        }
    }

    #[test]
    fn groups_same_ingredient_across_batches() {
        let flour = IngredientId::new();
        let butter = IngredientId::new();
        let (a, b) = (BatchId::new(), BatchId::new());
        let mut prepped = item(b, flour, "Flour", "250");
        prepped.is_prepped = true;

        let list = aggregate(&[
            item(a, flour, "Flour", "500"),
            item(a, butter, "butter", "120.5"),
            prepped,
        ]);

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].ingredient_name, "butter");
        assert_eq!(list[1].ingredient_name, "Flour");
        assert_eq!(list[1].total_quantity, Decimal::from(750));
        assert_eq!(list[1].prepped_quantity, Decimal::from(250));
        assert_eq!(list[1].remaining_quantity(), Decimal::from(500));
        assert_eq!(list[1].entries.len(), 2);
        assert!(!list[1].is_complete());
    }

    #[test]
    fn different_units_stay_separate() {
        let milk = IngredientId::new();
        let batch = BatchId::new();
        let mut litres = item(batch, milk, "Milk", "1.5");
        litres.unit = "l".to_string();

        let list = aggregate(&[item(batch, milk, "Milk", "200"), litres]);

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].unit, "g");
        assert_eq!(list[1].unit, "l");
    }

    #[test]
    fn every_item_appears_exactly_once() {
        let flour = IngredientId::new();
        let original = item(BatchId::new(), flour, "Flour", "10");
        let other = item(BatchId::new(), flour, "Flour", "5");

        let list = aggregate(&[original.clone(), other.clone(), original.clone()]);

        let ids: Vec<_> = list
            .iter()
            .flat_map(|l| l.entries.iter().map(|e| e.prep_item_id))
            .collect();
        assert_eq!(ids, vec![original.id, other.id]);
        assert_eq!(list[0].total_quantity, Decimal::from(15));
    }

    #[test]
    fn empty_day_yields_empty_list() {
        assert!(aggregate(&[]).is_empty());
    }
}
