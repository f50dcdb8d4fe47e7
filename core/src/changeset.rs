//! Atomic units of work.
//!
//! The engine never writes to the store piecemeal. Every operation describes its
//! writes as a [`ChangeSet`] (an ordered list of [`Mutation`]s) and hands it to
//! [`BatchStore::commit`](crate::providers::BatchStore::commit), which applies
//! all of them or none.
//!
//! # Ordering
//!
//! Mutations are applied in the order they were pushed. A merge relies on this:
//! contributions are re-parented onto the merged batch before the source
//! batches (and everything they own) are deleted.
//!
//! # Ownership
//!
//! Order contributions and prep items are owned by their batch. Deleting a
//! batch deletes its children as part of the same mutation, whatever the
//! backing store supports natively.

use crate::types::{Batch, BatchId, OrderContribution, PrepItem, Version};

/// A single write against the batch store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Insert a new batch (its version must be [`Version::initial`])
    InsertBatch(Batch),

    /// Overwrite a batch if its stored version equals `expected_version`.
    ///
    /// `batch.version` carries the version to store afterwards.
    UpdateBatch {
        /// New contents of the batch row
        batch: Batch,
        /// Version the caller read
        expected_version: Version,
    },

    /// Delete a batch with its contributions and prep items, if its stored
    /// version equals `expected_version`.
    DeleteBatch {
        /// Batch to delete
        batch_id: BatchId,
        /// Version the caller read
        expected_version: Version,
    },

    /// Record a provenance edge
    InsertContribution(OrderContribution),

    /// Move every contribution of `from` onto `to`, leaving order id, line
    /// index and quantity untouched
    ReparentContributions {
        /// Batch losing its contributions
        from: BatchId,
        /// Batch receiving them
        to: BatchId,
    },

    /// Insert one prep item
    InsertPrepItem(PrepItem),

    /// Replace every prep item of a batch with `items`
    ReplacePrepItems {
        /// Batch whose prep items are regenerated
        batch_id: BatchId,
        /// The new set
        items: Vec<PrepItem>,
    },
}

impl Mutation {
    /// Short name used in logs and error messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InsertBatch(_) => "insert_batch",
            Self::UpdateBatch { .. } => "update_batch",
            Self::DeleteBatch { .. } => "delete_batch",
            Self::InsertContribution(_) => "insert_contribution",
            Self::ReparentContributions { .. } => "reparent_contributions",
            Self::InsertPrepItem(_) => "insert_prep_item",
            Self::ReplacePrepItems { .. } => "replace_prep_items",
        }
    }
}

/// Ordered list of mutations applied atomically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    mutations: Vec<Mutation>,
}

impl ChangeSet {
    /// Create an empty change set
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mutations: Vec::new(),
        }
    }

    /// Append a raw mutation
    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    /// Insert a new batch
    pub fn insert_batch(&mut self, batch: Batch) -> &mut Self {
        self.push(Mutation::InsertBatch(batch))
    }

    /// Update a batch guarded by the version it was read at
    pub fn update_batch(&mut self, batch: Batch, expected_version: Version) -> &mut Self {
        self.push(Mutation::UpdateBatch {
            batch,
            expected_version,
        })
    }

    /// Delete a batch and everything it owns
    pub fn delete_batch(&mut self, batch_id: BatchId, expected_version: Version) -> &mut Self {
        self.push(Mutation::DeleteBatch {
            batch_id,
            expected_version,
        })
    }

    /// Insert contributions in order
    pub fn insert_contributions(
        &mut self,
        contributions: impl IntoIterator<Item = OrderContribution>,
    ) -> &mut Self {
        self.mutations
            .extend(contributions.into_iter().map(Mutation::InsertContribution));
        self
    }

    /// Move all contributions of `from` to `to`
    pub fn reparent_contributions(&mut self, from: BatchId, to: BatchId) -> &mut Self {
        self.push(Mutation::ReparentContributions { from, to })
    }

    /// Insert prep items in order
    pub fn insert_prep_items(&mut self, items: impl IntoIterator<Item = PrepItem>) -> &mut Self {
        self.mutations
            .extend(items.into_iter().map(Mutation::InsertPrepItem));
        self
    }

    /// Replace a batch's prep items
    pub fn replace_prep_items(&mut self, batch_id: BatchId, items: Vec<PrepItem>) -> &mut Self {
        self.push(Mutation::ReplacePrepItems { batch_id, items })
    }

    /// Mutations in application order
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Consume the change set, yielding its mutations in order
    #[must_use]
    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }

    /// Number of mutations
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Whether the change set has nothing to apply
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl Extend<Mutation> for ChangeSet {
    fn extend<I: IntoIterator<Item = Mutation>>(&mut self, iter: I) {
        self.mutations.extend(iter);
    }
}
