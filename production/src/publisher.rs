//! In-process event publisher.

use bakehouse_core::error::PublishError;
use bakehouse_core::event::EventEnvelope;
use bakehouse_core::providers::EventPublisher;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::broadcast;

/// Fans batch events out to in-process subscribers over a tokio broadcast
/// channel.
///
/// Publishing with no subscribers is not an error: the event is simply
/// dropped. Subscribers that fall more than `capacity` events behind observe
/// [`broadcast::error::RecvError::Lagged`] and skip ahead.
///
/// # Example
///
/// ```
/// use bakehouse_core::providers::EventPublisher;
/// use bakehouse_core::{BatchEvent, BatchId, EventEnvelope, StoreId, Utc};
/// use bakehouse_production::BroadcastEventPublisher;
///
/// # tokio_test::block_on(async {
/// let publisher = BroadcastEventPublisher::new(16);
/// let mut events = publisher.subscribe();
///
/// let batch_id = BatchId::new();
/// let envelope = EventEnvelope::new(StoreId::new(), BatchEvent::Completed { batch_id }, Utc::now());
/// publisher.publish(envelope.clone()).await.unwrap();
///
/// assert_eq!(events.recv().await.unwrap(), envelope);
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<EventEnvelope>,
}

impl BroadcastEventPublisher {
    /// Create a publisher buffering up to `capacity` events per subscriber
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Start receiving events published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(
        &self,
        envelope: EventEnvelope,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + '_>> {
        Box::pin(async move {
            let event_name = envelope.event_name();
            match self.sender.send(envelope) {
                Ok(receivers) => {
                    tracing::trace!(event_name, receivers, "Event broadcast");
                }
                Err(_) => {
                    tracing::trace!(event_name, "Event dropped, no subscribers");
                }
            }
            Ok(())
        })
    }
}
