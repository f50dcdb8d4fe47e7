//! Recipe source trait.

use crate::error::RecipeSourceError;
use crate::types::{Recipe, RecipeId, StoreId};
use std::future::Future;
use std::pin::Pin;

/// Read access to recipes and their bills of materials.
///
/// Lookups are fallible: a recipe may have been deleted after batches were
/// scheduled against it. The engine treats every error from this trait as a
/// degraded lookup (empty name, no prep items), never as a failed operation.
pub trait RecipeSource: Send + Sync {
    /// Fetch a recipe by id.
    ///
    /// # Errors
    ///
    /// - [`RecipeSourceError::NotFound`] if the recipe does not exist in this store
    /// - [`RecipeSourceError::Unavailable`] if the source could not answer
    fn get_recipe(
        &self,
        store_id: StoreId,
        recipe_id: RecipeId,
    ) -> Pin<Box<dyn Future<Output = Result<Recipe, RecipeSourceError>> + Send + '_>>;
}
