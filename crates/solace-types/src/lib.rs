//! Shared document models, queries and change events for the Solace client.
//!
//! Nothing in here talks to storage or the network; the store, the change
//! feed and the screen logic all build on these types.

pub mod api;
pub mod events;
pub mod models;
pub mod query;

pub use models::Document;
pub use query::{Direction, Filter, OrderBy, Query};
