//! Change feed, live collection watcher and the backend contract.
//!
//! [`LocalBackend`] implements [`Backend`] over the SQLite document store and
//! publishes a [`ChangeEvent`](solace_types::events::ChangeEvent) through the
//! [`Dispatcher`] after every write. Watchers re-run their query on each
//! event for their collection and hand the full result set to the caller.

pub mod backend;
pub mod dispatcher;
pub mod watcher;

pub use backend::{Backend, LocalBackend};
pub use dispatcher::Dispatcher;
pub use watcher::{ErrorHandler, SnapshotHandler, Subscription};
