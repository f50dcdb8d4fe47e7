//! Error types raised by the engine's collaborators.
//!
//! Each boundary gets its own enum so callers can tell a store failure from a
//! recipe lookup miss. The engine decides which ones propagate: store and order
//! source errors always do, recipe errors never do, publish errors are logged.

use crate::types::{BatchId, RecipeId, Version};
use thiserror::Error;

/// Errors from a batch store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A mutation referenced a row that does not exist in this store partition.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of row that was missing
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Optimistic concurrency conflict: the batch changed since it was read.
    ///
    /// The whole change set is rolled back when this is returned.
    #[error("Version conflict on batch {batch_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Batch whose version did not match
        batch_id: BatchId,
        /// Version the caller read
        expected: Version,
        /// Version currently stored
        actual: Version,
    },

    /// An insert collided with an existing row.
    #[error("Duplicate {entity}: {id}")]
    Duplicate {
        /// Kind of row that collided
        entity: &'static str,
        /// Identifier that collided
        id: String,
    },

    /// Database connection or query failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Shorthand for a missing batch
    #[must_use]
    pub fn batch_not_found(id: BatchId) -> Self {
        Self::NotFound {
            entity: "batch",
            id: id.to_string(),
        }
    }
}

/// Errors from a recipe source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipeSourceError {
    /// The recipe does not exist (or was deleted).
    #[error("Recipe not found: {0}")]
    NotFound(RecipeId),

    /// The source could not be reached or answered with an error.
    #[error("Recipe source unavailable: {0}")]
    Unavailable(String),
}

/// Errors from an order source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderSourceError {
    /// The source could not be reached or answered with an error.
    #[error("Order source unavailable: {0}")]
    Unavailable(String),
}

/// Errors from an event publisher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The event could not be handed to the transport.
    #[error("Publish failed for {event_name}: {reason}")]
    Failed {
        /// Wire name of the event
        event_name: &'static str,
        /// Reason for failure
        reason: String,
    },
}
