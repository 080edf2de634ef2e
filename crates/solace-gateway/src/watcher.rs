use std::future::Future;

use anyhow::{Result, anyhow};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use solace_types::{Document, Query};

use crate::dispatcher::Dispatcher;

/// Receives the complete result set of a watched query.
pub type SnapshotHandler = Box<dyn FnMut(Vec<Document>) + Send + 'static>;

/// Receives the error that stopped a watch. Called at most once.
pub type ErrorHandler = Box<dyn FnOnce(anyhow::Error) + Send + 'static>;

/// Handle to a live watch. Dropping it unsubscribes.
pub struct Subscription {
    token: CancellationToken,
    collection: String,
}

impl Subscription {
    /// Stop delivery. Calling this more than once is harmless.
    ///
    /// Rebuilds already started from an earlier snapshot keep running; only
    /// future snapshots are suppressed.
    pub fn unsubscribe(&self) {
        if !self.token.is_cancelled() {
            debug!(collection = %self.collection, "unsubscribed");
            self.token.cancel();
        }
    }

    /// False once unsubscribed, or once the watch stopped on an error.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Start watching `query`. `fetch` evaluates the query against the store; it
/// runs once up front and again after every change event for the query's
/// collection.
///
/// On any failure `on_error` runs once and the watch goes inert. There is no
/// resubscribe.
pub fn spawn<F, Fut>(
    dispatcher: &Dispatcher,
    query: Query,
    fetch: F,
    mut on_snapshot: SnapshotHandler,
    on_error: ErrorHandler,
) -> Subscription
where
    F: Fn(Query) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<Document>>> + Send + 'static,
{
    // Subscribe before the first fetch so no write between the two is missed.
    let mut rx = dispatcher.subscribe();
    let token = CancellationToken::new();
    let stop = token.clone();
    let collection = query.collection.clone();

    tokio::spawn(async move {
        let mut refresh = true;

        loop {
            if refresh {
                match fetch(query.clone()).await {
                    Ok(docs) => {
                        if stop.is_cancelled() {
                            break;
                        }
                        on_snapshot(docs);
                    }
                    Err(e) => {
                        warn!(collection = %query.collection, error = %e, "watch query failed");
                        stop.cancel();
                        on_error(e);
                        break;
                    }
                }
            }

            refresh = tokio::select! {
                _ = stop.cancelled() => break,
                result = rx.recv() => match result {
                    Ok(event) => event.touches(&query.collection),
                    Err(RecvError::Lagged(n)) => {
                        // Snapshots are full result sets, so one refetch catches up.
                        warn!(collection = %query.collection, "change feed lagged by {} events", n);
                        true
                    }
                    Err(RecvError::Closed) => {
                        stop.cancel();
                        on_error(anyhow!("change feed closed"));
                        break;
                    }
                },
            };
        }
    });

    Subscription { token, collection }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;
    use solace_types::events::{ChangeEvent, ChangeKind};
    use tokio::sync::mpsc;

    fn channel_handler() -> (SnapshotHandler, mpsc::UnboundedReceiver<Vec<Document>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Box::new(move |docs| {
                let _ = tx.send(docs);
            }),
            rx,
        )
    }

    #[tokio::test]
    async fn refetches_only_for_its_collection() {
        let dispatcher = Dispatcher::new();
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let (on_snapshot, mut snapshots) = channel_handler();

        let sub = spawn(
            &dispatcher,
            Query::collection("chats"),
            move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(vec![Document::new(format!("doc{n}"), json!({}))]) }
            },
            on_snapshot,
            Box::new(|_| {}),
        );

        assert_eq!(snapshots.recv().await.unwrap()[0].id, "doc0");

        dispatcher.broadcast(ChangeEvent::new("profiles", "u1", ChangeKind::Modified));
        dispatcher.broadcast(ChangeEvent::new("chats", "c1", ChangeKind::Added));

        assert_eq!(snapshots.recv().await.unwrap()[0].id, "doc1");
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert!(sub.is_active());
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_stops_delivery() {
        let dispatcher = Dispatcher::new();
        let (on_snapshot, mut snapshots) = channel_handler();

        let sub = spawn(
            &dispatcher,
            Query::collection("chats"),
            |_| async { Ok(Vec::new()) },
            on_snapshot,
            Box::new(|_| {}),
        );
        snapshots.recv().await.unwrap();

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());

        dispatcher.broadcast(ChangeEvent::new("chats", "c1", ChangeKind::Added));

        // The task drops its handler on exit, closing the channel.
        let next = tokio::time::timeout(Duration::from_secs(1), snapshots.recv()).await;
        assert!(matches!(next, Ok(None)));
    }

    #[tokio::test]
    async fn error_is_reported_once_and_watch_goes_inert() {
        let dispatcher = Dispatcher::new();
        let (err_tx, mut errors) = mpsc::unbounded_channel();
        let (on_snapshot, mut snapshots) = channel_handler();

        let sub = spawn(
            &dispatcher,
            Query::collection("chats"),
            |_| async { Err(anyhow!("permission denied")) },
            on_snapshot,
            Box::new(move |e| {
                let _ = err_tx.send(e.to_string());
            }),
        );

        assert_eq!(errors.recv().await.unwrap(), "permission denied");
        assert!(errors.recv().await.is_none());
        assert!(snapshots.recv().await.is_none());
        assert!(!sub.is_active());
    }
}
