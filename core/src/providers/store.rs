//! Batch store trait.
//!
//! # Store scoping
//!
//! Every method takes the [`StoreId`] partition key. Implementations must
//! never return or modify rows belonging to another store: a batch id that
//! exists under a different store behaves exactly like a missing one.
//!
//! # Writes
//!
//! There is a single write entry point, [`BatchStore::commit`], taking a
//! [`ChangeSet`]. The only exception is the prep checklist flag, which kitchen
//! staff flip independently of any batch reorganisation.

use crate::changeset::ChangeSet;
use crate::error::StoreError;
use crate::types::{
    Batch, BatchId, DateRange, OrderContribution, PrepItem, PrepItemId, StoreId,
};
use chrono::NaiveDate;
use std::future::Future;
use std::pin::Pin;

/// Durable storage for batches, order contributions and prep items.
pub trait BatchStore: Send + Sync {
    /// Load a batch.
    ///
    /// Returns `Ok(None)` when the batch does not exist in this store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    fn find_batch(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Batch>, StoreError>> + Send + '_>>;

    /// Load every batch scheduled on `date`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    fn find_batches_by_date(
        &self,
        store_id: StoreId,
        date: NaiveDate,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Batch>, StoreError>> + Send + '_>>;

    /// Load every batch whose production date falls inside `range`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    fn find_batches_in_range(
        &self,
        store_id: StoreId,
        range: DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Batch>, StoreError>> + Send + '_>>;

    /// Load the order contributions owned by a batch.
    ///
    /// An unknown batch yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    fn order_contributions(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OrderContribution>, StoreError>> + Send + '_>>;

    /// Load the prep items owned by a batch.
    ///
    /// An unknown batch yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    fn prep_items(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PrepItem>, StoreError>> + Send + '_>>;

    /// Load every prep item owned by a batch scheduled on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    fn prep_items_by_date(
        &self,
        store_id: StoreId,
        date: NaiveDate,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PrepItem>, StoreError>> + Send + '_>>;

    /// Set a prep item's checklist flag.
    ///
    /// Returns the updated item, or `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the update fails.
    fn set_prep_item_prepped(
        &self,
        store_id: StoreId,
        prep_item_id: PrepItemId,
        is_prepped: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PrepItem>, StoreError>> + Send + '_>>;

    /// Apply a change set atomically.
    ///
    /// Either every mutation is applied, in order, or none is.
    ///
    /// # Errors
    ///
    /// - [`StoreError::VersionConflict`] if a guarded update or delete found a
    ///   different version than expected
    /// - [`StoreError::NotFound`] if a mutation references a missing batch
    /// - [`StoreError::Duplicate`] if an insert collides with an existing row
    /// - [`StoreError::Database`] if the backend fails
    fn commit(
        &self,
        store_id: StoreId,
        changes: ChangeSet,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;
}
