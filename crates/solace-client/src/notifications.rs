use tokio::sync::watch;
use tracing::warn;

use solace_gateway::{Backend, Subscription};
use solace_types::models::collections;
use solace_types::{Filter, Query};

/// Unread notifications addressed to `user_id`.
pub fn unread_query(user_id: &str) -> Query {
    Query::collection(collections::NOTIFICATIONS)
        .filter(Filter::eq("recipientId", user_id))
        .filter(Filter::eq("isRead", false))
}

/// Header badge: the number of unread notifications. Counted, never listed.
pub struct NotificationBadge {
    count: watch::Sender<usize>,
}

impl NotificationBadge {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }

    pub fn start<B: Backend>(&self, backend: &B, user_id: &str) -> Subscription {
        let count = self.count.clone();
        let user = user_id.to_string();

        backend.watch(
            unread_query(user_id),
            Box::new(move |docs| {
                count.send_replace(docs.len());
            }),
            Box::new(move |e| warn!(user = %user, error = %e, "notification badge stopped")),
        )
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }
}

impl Default for NotificationBadge {
    fn default() -> Self {
        Self::new()
    }
}
