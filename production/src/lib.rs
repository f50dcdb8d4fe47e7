//! # Bakehouse Production
//!
//! Production batch scheduling and aggregation for bakery kitchens.
//!
//! The engine turns customer orders into production batches, remembers which
//! order lines funded each batch, derives ingredient prep items from recipe
//! bills of materials, and moves batches through the kitchen pipeline,
//! including splitting and merging them without losing quantity or
//! provenance.
//!
//! ## Architecture: Functional Core, Imperative Shell
//!
//! ```text
//!            ┌──────────────────────── pure ────────────────────────┐
//!            │ aggregator   deriver   lifecycle   prep_list          │
//!            │   group_demand, plan_* → Plan { output, changes, events }
//!            └───────────────────────────┬──────────────────────────┘
//!                                        │
//! BatchService (shell): load ──► plan ──► BatchStore::commit ──► EventPublisher::publish
//! ```
//!
//! Planners never touch I/O, so every invariant is testable without a store.
//! The [`BatchService`] loads inputs, commits each plan's change set
//! atomically and publishes events only after the commit succeeded.
//!
//! ## Components
//!
//! - [`aggregator`]: orders → batches with order contributions
//! - [`deriver`]: bill of materials × quantity → prep items, and the
//!   best-effort recipe policy
//! - [`lifecycle`]: stage changes, split, merge, edit, delete
//! - [`prep_list`]: a day's prep items folded per ingredient
//! - [`service`]: the shell tying them to the collaborators

pub mod aggregator;
pub mod config;
pub mod deriver;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod prep_list;
pub mod publisher;
pub mod service;
pub mod types;

pub use config::{Config, EngineConfig, EventConfig, PostgresConfig};
pub use deriver::ResolvedRecipe;
pub use environment::ProductionEnvironment;
pub use error::{EntityKind, ProductionError, Result};
pub use prep_list::{AggregatedPrepItem, PrepListEntry};
pub use publisher::BroadcastEventPublisher;
pub use service::BatchService;
pub use types::{
    BatchDetail, BatchUpdate, NewBatch, Plan, ProvenanceReport, SplitOutcome, TimelineDay,
};
