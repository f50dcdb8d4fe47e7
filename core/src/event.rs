//! Batch lifecycle events.
//!
//! Events are facts published after a change has been committed to the store.
//! Downstream subsystems (inventory deduction, UI refresh) subscribe to them by
//! wire name.
//!
//! # Wire format
//!
//! ```text
//! {
//!   "storeId": "…",
//!   "event": { "eventName": "BATCH_STAGE_CHANGED",
//!              "payload": { "batchId": "…", "previousStage": "MIXING", "newStage": "READY" } },
//!   "timestamp": "2025-01-01T00:00:00Z"
//! }
//! ```

use crate::types::{BatchId, BatchStage, RecipeId, StoreId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire name of [`BatchEvent::Created`]
pub const BATCH_CREATED: &str = "BATCH_CREATED";
/// Wire name of [`BatchEvent::StageChanged`]
pub const BATCH_STAGE_CHANGED: &str = "BATCH_STAGE_CHANGED";
/// Wire name of [`BatchEvent::Completed`]
pub const BATCH_COMPLETED: &str = "BATCH_COMPLETED";
/// Wire name of [`BatchEvent::Deleted`]
pub const BATCH_DELETED: &str = "BATCH_DELETED";

/// Something that happened to a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventName", content = "payload")]
pub enum BatchEvent {
    /// A batch was created (manually, by generation, split or merge)
    #[serde(rename = "BATCH_CREATED", rename_all = "camelCase")]
    Created {
        /// New batch
        batch_id: BatchId,
        /// Recipe it produces
        recipe_id: RecipeId,
    },

    /// A batch's stage was set. Published once per stage update, even when
    /// the stage did not change.
    #[serde(rename = "BATCH_STAGE_CHANGED", rename_all = "camelCase")]
    StageChanged {
        /// Batch that moved
        batch_id: BatchId,
        /// Stage before the update
        previous_stage: BatchStage,
        /// Stage after the update
        new_stage: BatchStage,
    },

    /// A batch reached `PACKAGED`
    #[serde(rename = "BATCH_COMPLETED", rename_all = "camelCase")]
    Completed {
        /// Completed batch
        batch_id: BatchId,
    },

    /// A batch was removed, explicitly or because it was merged away
    #[serde(rename = "BATCH_DELETED", rename_all = "camelCase")]
    Deleted {
        /// Removed batch
        batch_id: BatchId,
    },
}

impl BatchEvent {
    /// Stable wire name used by subscribers
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Created { .. } => BATCH_CREATED,
            Self::StageChanged { .. } => BATCH_STAGE_CHANGED,
            Self::Completed { .. } => BATCH_COMPLETED,
            Self::Deleted { .. } => BATCH_DELETED,
        }
    }

    /// Batch the event is about
    #[must_use]
    pub const fn batch_id(&self) -> BatchId {
        match self {
            Self::Created { batch_id, .. }
            | Self::StageChanged { batch_id, .. }
            | Self::Completed { batch_id }
            | Self::Deleted { batch_id } => *batch_id,
        }
    }
}

/// An event plus the routing data a publisher needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Store the batch belongs to
    pub store_id: StoreId,
    /// The event itself
    pub event: BatchEvent,
    /// When the engine emitted the event
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    /// Wraps an event for publishing
    #[must_use]
    pub const fn new(store_id: StoreId, event: BatchEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            store_id,
            event,
            timestamp,
        }
    }

    /// Wire name of the wrapped event
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        self.event.event_name()
    }

    /// The event payload as JSON, without the name tag
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be serialized.
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(&self.event)?;
        Ok(value
            .get_mut("payload")
            .map(serde_json::Value::take)
            .unwrap_or_default())
    }
}
