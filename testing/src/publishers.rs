//! Event publishers for tests.

use bakehouse_core::error::PublishError;
use bakehouse_core::event::EventEnvelope;
use bakehouse_core::providers::EventPublisher;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

/// Publisher that records every envelope it receives, in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl RecordingEventPublisher {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every envelope published so far
    #[must_use]
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wire names of every event published so far
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(EventEnvelope::event_name)
            .collect()
    }

    /// Forget recorded events
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(
        &self,
        envelope: EventEnvelope,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + '_>> {
        Box::pin(async move {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(envelope);
            Ok(())
        })
    }
}

/// Publisher whose transport is always down.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingEventPublisher;

impl EventPublisher for FailingEventPublisher {
    fn publish(
        &self,
        envelope: EventEnvelope,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + '_>> {
        Box::pin(async move {
            Err(PublishError::Failed {
                event_name: envelope.event_name(),
                reason: "transport unavailable".to_string(),
            })
        })
    }
}
