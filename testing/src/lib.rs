//! # Bakehouse Testing
//!
//! Testing utilities for the bakehouse production engine.
//!
//! This crate provides:
//! - In-memory implementations of every collaborator trait
//!   ([`InMemoryBatchStore`], [`MockRecipeSource`], [`MockOrderSource`],
//!   [`RecordingEventPublisher`], [`FailingEventPublisher`])
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Fixture builders for orders and recipes
//! - proptest strategies for domain values
//!
//! ## Example
//!
//! ```
//! use bakehouse_core::providers::BatchStore;
//! use bakehouse_core::StoreId;
//! use bakehouse_testing::{InMemoryBatchStore, fixtures};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryBatchStore::new();
//! let batches = store
//!     .find_batches_by_date(StoreId::new(), fixtures::production_date())
//!     .await
//!     .unwrap();
//! assert!(batches.is_empty());
//! # });
//! ```

pub mod batch_store;
pub mod fixtures;
pub mod publishers;
pub mod sources;
pub mod strategies;

use bakehouse_core::environment::Clock;
use chrono::{DateTime, Utc};

/// Mock clocks.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use bakehouse_testing::mocks::FixedClock;
    /// use bakehouse_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep a handle while the
    /// engine owns another.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use batch_store::InMemoryBatchStore;
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use publishers::{FailingEventPublisher, RecordingEventPublisher};
pub use sources::{MockOrderSource, MockRecipeSource};
