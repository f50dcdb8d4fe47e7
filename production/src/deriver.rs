//! Prep item derivation.
//!
//! Scales a recipe's bill of materials by a batch quantity. Recipe lookups
//! are best-effort: [`resolve_recipe`] turns a failed lookup into an empty
//! recipe, so a batch without a buildable recipe is still scheduled, just
//! with no name and no prep items.

use crate::error::{ProductionError, Result};
use bakehouse_core::error::RecipeSourceError;
use bakehouse_core::types::{Batch, BillOfMaterialsEntry, IngredientId, PrepItem, PrepItemId, Recipe};
use rust_decimal::{Decimal, RoundingStrategy};

/// Recipe data as the engine consumes it, after the best-effort policy ran.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedRecipe {
    /// Recipe name, empty when unresolved
    pub name: String,
    /// Bill of materials, empty when unresolved
    pub ingredients: Vec<BillOfMaterialsEntry>,
    /// Whether the lookup failed
    pub degraded: bool,
}

impl ResolvedRecipe {
    /// The placeholder used when a recipe cannot be looked up
    #[must_use]
    pub fn unresolved() -> Self {
        Self {
            degraded: true,
            ..Self::default()
        }
    }
}

impl From<Recipe> for ResolvedRecipe {
    fn from(recipe: Recipe) -> Self {
        Self {
            name: recipe.name,
            ingredients: recipe.ingredients,
            degraded: false,
        }
    }
}

/// Apply the best-effort recipe policy to a lookup result.
///
/// Any error, whether the recipe is missing or the source is down, yields
/// [`ResolvedRecipe::unresolved`]. The failure is logged and counted.
#[must_use]
pub fn resolve_recipe(lookup: std::result::Result<Recipe, RecipeSourceError>) -> ResolvedRecipe {
    match lookup {
        Ok(recipe) => recipe.into(),
        Err(error) => {
            tracing::warn!(%error, "Recipe lookup failed; continuing without name or prep items");
            metrics::counter!("production.recipe.degraded").increment(1);
            ResolvedRecipe::unresolved()
        }
    }
}

/// Round to `scale` decimal places, halves away from zero, without trailing zeros.
///
/// ```
/// use bakehouse_production::deriver::round_quantity;
/// use bakehouse_core::Decimal;
///
/// let value: Decimal = "1.23455".parse().unwrap();
/// assert_eq!(round_quantity(value, 4).to_string(), "1.2346");
/// ```
#[must_use]
pub fn round_quantity(value: Decimal, scale: u32) -> Decimal {
    value
        .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Derive a batch's prep items from a bill of materials.
///
/// One item per ingredient, in bill-of-materials order. An ingredient listed
/// more than once has its per-unit quantities summed under its first name and
/// unit. Each `required_quantity` is `per_unit × batch.quantity` rounded to
/// `scale` places.
///
/// # Errors
///
/// Returns [`ProductionError::Validation`] if a quantity does not fit in a
/// [`Decimal`].
pub fn derive_prep_items(
    batch: &Batch,
    bill_of_materials: &[BillOfMaterialsEntry],
    scale: u32,
) -> Result<Vec<PrepItem>> {
    let mut merged: Vec<(IngredientId, &str, &str, Decimal)> = Vec::new();
    for entry in bill_of_materials {
        match merged.iter_mut().find(|(id, ..)| *id == entry.ingredient_id) {
            Some((.., per_unit)) => {
                *per_unit = per_unit
                    .checked_add(entry.quantity_per_output_unit)
                    .ok_or_else(|| overflow(batch, &entry.name))?;
            }
            None => merged.push((
                entry.ingredient_id,
                entry.name.as_str(),
                entry.unit.as_str(),
                entry.quantity_per_output_unit,
            )),
        }
    }

    merged
        .into_iter()
        .map(|(ingredient_id, name, unit, per_unit)| -> Result<PrepItem> {
            let required = per_unit
                .checked_mul(batch.quantity)
                .ok_or_else(|| overflow(batch, name))?;
            Ok(PrepItem {
                id: PrepItemId::new(),
                batch_id: batch.id,
                ingredient_id,
                ingredient_name: name.to_string(),
                required_quantity: round_quantity(required, scale),
                unit: unit.to_string(),
                is_prepped: false,
            })
        })
        .collect()
}

fn overflow(batch: &Batch, ingredient: &str) -> ProductionError {
    ProductionError::validation(format!(
        "Quantity of {ingredient} for {} units of batch {} is too large",
        batch.quantity, batch.id
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bakehouse_core::types::{RecipeId, StoreId};
    use bakehouse_testing::fixtures::{self, quantity};

    #[test]
    fn scales_bill_of_materials_by_batch_quantity() {
        let batch = fixtures::batch(StoreId::new(), Decimal::from(4));
        let recipe = fixtures::recipe("Brioche", &[("Butter", "kg", "0.5"), ("Sugar", "kg", "0.3")]);

        let items = derive_prep_items(&batch, &recipe.ingredients, 4).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].required_quantity, Decimal::from(2));
        assert_eq!(items[1].required_quantity, quantity("1.2"));
        assert!(items.iter().all(|i| i.batch_id == batch.id && !i.is_prepped));
        assert_eq!(items[0].unit, "kg");
    }

    #[test]
    fn rounds_to_four_places() {
        let batch = fixtures::batch(StoreId::new(), Decimal::from(3));
        let recipe = fixtures::recipe("Rolls", &[("Yeast", "g", "0.33333")]);

        let items = derive_prep_items(&batch, &recipe.ingredients, 4).unwrap();

        assert_eq!(items[0].required_quantity, quantity("1.0000"));
        assert_eq!(items[0].required_quantity.to_string(), "1");
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        assert_eq!(round_quantity(quantity("0.00005"), 4), quantity("0.0001"));
        assert_eq!(round_quantity(quantity("2.71825"), 4), quantity("2.7183"));
    }

    #[test]
    fn duplicate_ingredients_merge_into_one_item() {
        let batch = fixtures::batch(StoreId::new(), Decimal::from(10));
        let mut recipe = fixtures::recipe("Focaccia", &[("Olive oil", "ml", "2"), ("Salt", "g", "1")]);
        let mut topping = recipe.ingredients[0].clone();
        topping.quantity_per_output_unit = quantity("0.5");
        recipe.ingredients.push(topping);

        let items = derive_prep_items(&batch, &recipe.ingredients, 4).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].ingredient_name, "Olive oil");
        assert_eq!(items[0].required_quantity, Decimal::from(25));
    }

    #[test]
    fn overflowing_requirement_is_a_validation_error() {
        let batch = fixtures::batch(StoreId::new(), Decimal::MAX);
        let recipe = fixtures::recipe("Baguette", &[("Flour", "g", "1000")]);

        let result = derive_prep_items(&batch, &recipe.ingredients, 4);

        assert!(matches!(result, Err(ProductionError::Validation(_))));
    }

    #[test]
    fn failed_lookup_degrades_to_empty_recipe() {
        let resolved = resolve_recipe(Err(RecipeSourceError::NotFound(RecipeId::new())));
        assert!(resolved.degraded);
        assert_eq!(resolved.name, "");
        assert!(resolved.ingredients.is_empty());

        let batch = fixtures::batch(StoreId::new(), Decimal::from(5));
        assert!(derive_prep_items(&batch, &resolved.ingredients, 4).unwrap().is_empty());
    }

    #[test]
    fn successful_lookup_keeps_recipe() {
        let recipe = fixtures::recipe("Bagel", &[("Flour", "g", "90")]);
        let resolved = resolve_recipe(Ok(recipe.clone()));
        assert!(!resolved.degraded);
        assert_eq!(resolved.name, "Bagel");
        assert_eq!(resolved.ingredients, recipe.ingredients);
    }
}
