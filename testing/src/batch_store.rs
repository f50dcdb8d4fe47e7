//! In-memory batch store.
//!
//! Each store id gets its own partition. A commit applies its mutations to a
//! copy of the partition and swaps the copy in only when every mutation
//! succeeded, giving the same all-or-nothing behavior as a database
//! transaction.

use bakehouse_core::changeset::{ChangeSet, Mutation};
use bakehouse_core::error::StoreError;
use bakehouse_core::providers::BatchStore;
use bakehouse_core::types::{
    Batch, BatchId, DateRange, OrderContribution, PrepItem, PrepItemId, StoreId,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};

/// Rows belonging to one store.
#[derive(Clone, Debug, Default)]
struct Partition {
    batches: HashMap<BatchId, Batch>,
    // Insertion order is kept so reads are deterministic.
    contributions: Vec<OrderContribution>,
    prep_items: Vec<PrepItem>,
}

impl Partition {
    fn require_batch(&self, batch_id: BatchId) -> Result<&Batch, StoreError> {
        self.batches
            .get(&batch_id)
            .ok_or_else(|| StoreError::batch_not_found(batch_id))
    }

    fn check_version(
        &self,
        batch_id: BatchId,
        expected: bakehouse_core::Version,
    ) -> Result<(), StoreError> {
        let actual = self.require_batch(batch_id)?.version;
        if actual == expected {
            Ok(())
        } else {
            Err(StoreError::VersionConflict {
                batch_id,
                expected,
                actual,
            })
        }
    }

    fn apply(&mut self, mutation: Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::InsertBatch(batch) => {
                if self.batches.contains_key(&batch.id) {
                    return Err(StoreError::Duplicate {
                        entity: "batch",
                        id: batch.id.to_string(),
                    });
                }
                self.batches.insert(batch.id, batch);
            }
            Mutation::UpdateBatch {
                batch,
                expected_version,
            } => {
                self.check_version(batch.id, expected_version)?;
                self.batches.insert(batch.id, batch);
            }
            Mutation::DeleteBatch {
                batch_id,
                expected_version,
            } => {
                self.check_version(batch_id, expected_version)?;
                self.batches.remove(&batch_id);
                self.contributions.retain(|c| c.batch_id != batch_id);
                self.prep_items.retain(|p| p.batch_id != batch_id);
            }
            Mutation::InsertContribution(contribution) => {
                self.require_batch(contribution.batch_id)?;
                if self.contributions.iter().any(|c| c.id == contribution.id) {
                    return Err(StoreError::Duplicate {
                        entity: "order contribution",
                        id: contribution.id.to_string(),
                    });
                }
                self.contributions.push(contribution);
            }
            Mutation::ReparentContributions { from, to } => {
                self.require_batch(to)?;
                for contribution in &mut self.contributions {
                    if contribution.batch_id == from {
                        contribution.batch_id = to;
                    }
                }
            }
            Mutation::InsertPrepItem(item) => {
                self.require_batch(item.batch_id)?;
                if self.prep_items.iter().any(|p| p.id == item.id) {
                    return Err(StoreError::Duplicate {
                        entity: "prep item",
                        id: item.id.to_string(),
                    });
                }
                self.prep_items.push(item);
            }
            Mutation::ReplacePrepItems { batch_id, items } => {
                self.require_batch(batch_id)?;
                self.prep_items.retain(|p| p.batch_id != batch_id);
                self.prep_items.extend(items);
            }
        }
        Ok(())
    }
}

/// In-memory [`BatchStore`] for fast, deterministic tests.
///
/// Clones share the same data.
///
/// # Example
///
/// ```
/// use bakehouse_core::providers::BatchStore;
/// use bakehouse_core::{ChangeSet, StoreError, StoreId};
/// use bakehouse_testing::InMemoryBatchStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryBatchStore::new();
/// store.fail_next_commit(StoreError::Database("disk full".to_string()));
///
/// let result = store.commit(StoreId::new(), ChangeSet::new()).await;
/// assert!(result.is_err());
/// assert_eq!(store.commit_count(), 0);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryBatchStore {
    partitions: Arc<RwLock<HashMap<StoreId, Partition>>>,
    injected_failure: Arc<Mutex<Option<StoreError>>>,
    commits: Arc<Mutex<usize>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Database("in-memory store lock poisoned".to_string())
}

impl InMemoryBatchStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`BatchStore::commit`] fail with `error` without applying anything
    pub fn fail_next_commit(&self, error: StoreError) {
        if let Ok(mut slot) = self.injected_failure.lock() {
            *slot = Some(error);
        }
    }

    /// Number of successful commits so far
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.lock().map_or(0, |count| *count)
    }

    /// Number of batches held for a store
    #[must_use]
    pub fn batch_count(&self, store_id: StoreId) -> usize {
        self.read(store_id, |p| p.batches.len()).unwrap_or(0)
    }

    /// Number of order contributions held for a store
    #[must_use]
    pub fn contribution_count(&self, store_id: StoreId) -> usize {
        self.read(store_id, |p| p.contributions.len()).unwrap_or(0)
    }

    /// Number of prep items held for a store
    #[must_use]
    pub fn prep_item_count(&self, store_id: StoreId) -> usize {
        self.read(store_id, |p| p.prep_items.len()).unwrap_or(0)
    }

    fn read<T>(
        &self,
        store_id: StoreId,
        f: impl FnOnce(&Partition) -> T,
    ) -> Result<T, StoreError> {
        let partitions = self.partitions.read().map_err(poisoned)?;
        let empty = Partition::default();
        Ok(f(partitions.get(&store_id).unwrap_or(&empty)))
    }

    fn apply_changes(&self, store_id: StoreId, changes: ChangeSet) -> Result<(), StoreError> {
        if let Some(error) = self.injected_failure.lock().map_err(poisoned)?.take() {
            return Err(error);
        }

        let mut partitions = self.partitions.write().map_err(poisoned)?;
        let mut staged = partitions.get(&store_id).cloned().unwrap_or_default();
        for mutation in changes.into_mutations() {
            staged.apply(mutation)?;
        }
        partitions.insert(store_id, staged);

        *self.commits.lock().map_err(poisoned)? += 1;
        Ok(())
    }

    fn toggle(
        &self,
        store_id: StoreId,
        prep_item_id: PrepItemId,
        is_prepped: bool,
    ) -> Result<Option<PrepItem>, StoreError> {
        let mut partitions = self.partitions.write().map_err(poisoned)?;
        Ok(partitions.get_mut(&store_id).and_then(|partition| {
            partition
                .prep_items
                .iter_mut()
                .find(|p| p.id == prep_item_id)
                .map(|item| {
                    item.is_prepped = is_prepped;
                    item.clone()
                })
        }))
    }
}

impl BatchStore for InMemoryBatchStore {
    fn find_batch(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Batch>, StoreError>> + Send + '_>> {
        Box::pin(async move { self.read(store_id, |p| p.batches.get(&batch_id).cloned()) })
    }

    fn find_batches_by_date(
        &self,
        store_id: StoreId,
        date: NaiveDate,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Batch>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.read(store_id, |p| {
                p.batches
                    .values()
                    .filter(|b| b.production_date == date)
                    .cloned()
                    .collect()
            })
        })
    }

    fn find_batches_in_range(
        &self,
        store_id: StoreId,
        range: DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Batch>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.read(store_id, |p| {
                p.batches
                    .values()
                    .filter(|b| range.contains(b.production_date))
                    .cloned()
                    .collect()
            })
        })
    }

    fn order_contributions(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OrderContribution>, StoreError>> + Send + '_>>
    {
        Box::pin(async move {
            self.read(store_id, |p| {
                p.contributions
                    .iter()
                    .filter(|c| c.batch_id == batch_id)
                    .cloned()
                    .collect()
            })
        })
    }

    fn prep_items(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PrepItem>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.read(store_id, |p| {
                p.prep_items
                    .iter()
                    .filter(|i| i.batch_id == batch_id)
                    .cloned()
                    .collect()
            })
        })
    }

    fn prep_items_by_date(
        &self,
        store_id: StoreId,
        date: NaiveDate,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PrepItem>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.read(store_id, |p| {
                p.prep_items
                    .iter()
                    .filter(|i| {
                        p.batches
                            .get(&i.batch_id)
                            .is_some_and(|b| b.production_date == date)
                    })
                    .cloned()
                    .collect()
            })
        })
    }

    fn set_prep_item_prepped(
        &self,
        store_id: StoreId,
        prep_item_id: PrepItemId,
        is_prepped: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PrepItem>, StoreError>> + Send + '_>> {
        Box::pin(async move { self.toggle(store_id, prep_item_id, is_prepped) })
    }

    fn commit(
        &self,
        store_id: StoreId,
        changes: ChangeSet,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move { self.apply_changes(store_id, changes) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use bakehouse_core::types::{ContributionId, OrderId, Version};
    use rust_decimal::Decimal;

    fn contribution(batch_id: BatchId) -> OrderContribution {
        OrderContribution {
            id: ContributionId::new(),
            batch_id,
            order_id: OrderId::new(),
            order_item_index: 0,
            quantity_from_order: Decimal::from(5),
        }
    }

    #[tokio::test]
    async fn failed_mutation_rolls_back_whole_change_set() {
        let store = InMemoryBatchStore::new();
        let store_id = StoreId::new();
        let batch = fixtures::batch(store_id, Decimal::from(10));

        let mut changes = ChangeSet::new();
        changes
            .insert_batch(batch.clone())
            .insert_contributions([contribution(batch.id)])
            // Stale version: the batch was just inserted at version 1.
            .delete_batch(batch.id, Version::new(7));

        let err = store.commit(store_id, changes).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
        assert_eq!(store.batch_count(store_id), 0);
        assert_eq!(store.contribution_count(store_id), 0);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn delete_cascades_owned_rows() {
        let store = InMemoryBatchStore::new();
        let store_id = StoreId::new();
        let batch = fixtures::batch(store_id, Decimal::from(10));
        let item = fixtures::prep_item(batch.id, "Flour", Decimal::from(2));

        let mut changes = ChangeSet::new();
        changes
            .insert_batch(batch.clone())
            .insert_contributions([contribution(batch.id)])
            .insert_prep_items([item]);
        store.commit(store_id, changes).await.unwrap();

        let mut delete = ChangeSet::new();
        delete.delete_batch(batch.id, batch.version);
        store.commit(store_id, delete).await.unwrap();

        assert_eq!(store.batch_count(store_id), 0);
        assert_eq!(store.contribution_count(store_id), 0);
        assert_eq!(store.prep_item_count(store_id), 0);
    }

    #[tokio::test]
    async fn partitions_are_isolated_by_store() {
        let store = InMemoryBatchStore::new();
        let ours = StoreId::new();
        let theirs = StoreId::new();
        let batch = fixtures::batch(ours, Decimal::from(3));

        let mut changes = ChangeSet::new();
        changes.insert_batch(batch.clone());
        store.commit(ours, changes).await.unwrap();

        assert!(store.find_batch(theirs, batch.id).await.unwrap().is_none());
        assert!(store.find_batch(ours, batch.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reparent_moves_contributions_untouched() {
        let store = InMemoryBatchStore::new();
        let store_id = StoreId::new();
        let source = fixtures::batch(store_id, Decimal::from(5));
        let target = fixtures::batch(store_id, Decimal::from(5));
        let edge = contribution(source.id);

        let mut changes = ChangeSet::new();
        changes
            .insert_batch(source.clone())
            .insert_batch(target.clone())
            .insert_contributions([edge.clone()])
            .reparent_contributions(source.id, target.id);
        store.commit(store_id, changes).await.unwrap();

        let moved = store.order_contributions(store_id, target.id).await.unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].provenance(), edge.provenance());
        assert!(
            store
                .order_contributions(store_id, source.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn toggling_unknown_prep_item_returns_none() {
        let store = InMemoryBatchStore::new();
        let result = store
            .set_prep_item_prepped(StoreId::new(), PrepItemId::new(), true)
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
