//! Error types for the production engine.

use bakehouse_core::error::{OrderSourceError, StoreError};
use bakehouse_core::types::{BatchId, PrepItemId};
use std::fmt;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ProductionError>;

/// Kind of entity a [`ProductionError::NotFound`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// A production batch
    Batch,
    /// A prep item
    PrepItem,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Batch => "Batch",
            Self::PrepItem => "Prep item",
        })
    }
}

/// Errors surfaced by [`BatchService`](crate::service::BatchService).
///
/// Recipe lookup failures never appear here: they degrade to an empty recipe
/// name and no prep items. Publish failures never appear either: they are
/// logged after the commit that produced them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProductionError {
    // ═══════════════════════════════════════════════════════════
    // Caller errors
    // ═══════════════════════════════════════════════════════════

    /// A referenced batch or prep item does not exist for the store.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// What was looked up
        entity: EntityKind,
        /// Identifier that was looked up
        id: String,
    },

    /// The input was rejected; the caller must correct it.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // Concurrency
    // ═══════════════════════════════════════════════════════════

    /// A batch changed between read and commit. Nothing was written.
    #[error("Conflict: {0}")]
    Conflict(String),

    // ═══════════════════════════════════════════════════════════
    // Collaborator failures
    // ═══════════════════════════════════════════════════════════

    /// The batch store failed.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// The order source failed.
    #[error("Order source error: {0}")]
    OrderSource(#[from] OrderSourceError),
}

impl ProductionError {
    /// Missing batch
    #[must_use]
    pub fn batch_not_found(id: BatchId) -> Self {
        Self::NotFound {
            entity: EntityKind::Batch,
            id: id.to_string(),
        }
    }

    /// Missing prep item
    #[must_use]
    pub fn prep_item_not_found(id: PrepItemId) -> Self {
        Self::NotFound {
            entity: EntityKind::PrepItem,
            id: id.to_string(),
        }
    }

    /// Rejected input
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns `true` if the caller sent something that can never succeed as-is.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bakehouse_production::ProductionError;
    /// assert!(ProductionError::validation("bad split").is_user_error());
    /// assert!(!ProductionError::Conflict("raced".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Validation(_))
    }

    /// Returns `true` if repeating the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::Store(StoreError::Database(_)) | Self::OrderSource(_)
        )
    }
}

impl From<StoreError> for ProductionError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::VersionConflict { .. } => Self::Conflict(error.to_string()),
            other => Self::Store(other),
        }
    }
}
