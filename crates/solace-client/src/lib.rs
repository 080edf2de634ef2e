//! Screen logic for the Solace booking client.
//!
//! Everything here runs against a [`Backend`](solace_gateway::Backend): the
//! process-wide [`client`] holds the real one, tests use the in-memory
//! store. Screens own a projection or a guard, feed it events and read back
//! view state and navigation requests.

pub mod chat_list;
pub mod chat_room;
pub mod checkin;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod notifications;
pub mod profile;
pub mod routes;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{BackendClient, client, initialize};
pub use config::BackendConfig;
pub use error::{ClientError, ErrorAction, Result};
pub use session::Session;
