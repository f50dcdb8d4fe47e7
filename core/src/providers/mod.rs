//! Collaborator traits.
//!
//! The engine depends on four external collaborators, each behind a trait so
//! that tests run against in-memory implementations and production runs
//! against real services:
//!
//! - [`BatchStore`]: durable storage for batches and the rows they own
//! - [`RecipeSource`]: recipe names and bills of materials
//! - [`OrderSource`]: customer orders by due date
//! - [`EventPublisher`]: fire-and-forget lifecycle notifications
//!
//! # Dyn Compatibility
//!
//! All traits return `Pin<Box<dyn Future>>` instead of using `async fn` so they
//! can be held as `Arc<dyn Trait>` inside the engine's environment.

pub mod order;
pub mod publisher;
pub mod recipe;
pub mod store;

pub use order::OrderSource;
pub use publisher::EventPublisher;
pub use recipe::RecipeSource;
pub use store::BatchStore;
