//! # Bakehouse Core
//!
//! Domain types and collaborator traits for the production batch engine.
//!
//! This crate holds everything the engine and its adapters agree on:
//!
//! - **Entities**: [`Batch`](types::Batch), [`OrderContribution`](types::OrderContribution),
//!   [`PrepItem`](types::PrepItem), all store-scoped and owned by their batch
//! - **Inputs**: [`Order`](types::Order) and [`Recipe`](types::Recipe) as handed over
//!   by the order and recipe sources
//! - **Events**: [`BatchEvent`](event::BatchEvent) and its publishing envelope
//! - **Unit of work**: [`ChangeSet`](changeset::ChangeSet), the ordered list of
//!   mutations a store applies atomically
//! - **Providers**: the [`BatchStore`](providers::BatchStore),
//!   [`RecipeSource`](providers::RecipeSource), [`OrderSource`](providers::OrderSource)
//!   and [`EventPublisher`](providers::EventPublisher) traits
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ OrderSource  │   │ RecipeSource │
//! └──────┬───────┘   └──────┬───────┘
//!        │                  │
//!        ▼                  ▼
//! ┌─────────────────────────────────┐
//! │   Engine (pure planners)        │──► ChangeSet ──► BatchStore::commit
//! └─────────────────────────────────┘                        │
//!                                                            ▼
//!                                                   EventPublisher::publish
//! ```
//!
//! Implementations of the providers live in other crates:
//! `bakehouse-testing` (in-memory) and `bakehouse-postgres` (`PostgreSQL`).

pub mod changeset;
pub mod environment;
pub mod error;
pub mod event;
pub mod providers;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use rust_decimal::Decimal;

pub use changeset::{ChangeSet, Mutation};
pub use error::{OrderSourceError, PublishError, RecipeSourceError, StoreError};
pub use event::{BatchEvent, EventEnvelope};
pub use types::*;
