//! Event publisher trait.

use crate::error::PublishError;
use crate::event::EventEnvelope;
use std::future::Future;
use std::pin::Pin;

/// Fire-and-forget delivery of batch lifecycle events.
///
/// Delivery is at-most-once from the engine's point of view: the engine
/// publishes after a successful commit and does not retry. A returned error
/// is logged and counted, never surfaced to the engine's caller.
pub trait EventPublisher: Send + Sync {
    /// Publish one event.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Failed`] if the transport rejected the event.
    fn publish(
        &self,
        envelope: EventEnvelope,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + '_>>;
}
