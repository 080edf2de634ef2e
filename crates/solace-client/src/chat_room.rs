//! A single chat: the live message thread plus sending and read receipts.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Map;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use solace_gateway::{Backend, Subscription};
use solace_types::models::{ChatMessage, collections, to_fields};
use solace_types::{Direction, Document, Filter, Query};

use crate::error::{ClientError, Result};

pub struct ChatRoom<B: Backend> {
    backend: Arc<B>,
    chat_id: String,
    user_id: String,
    messages: watch::Sender<Vec<ChatMessage>>,
}

impl<B: Backend> ChatRoom<B> {
    pub fn new(backend: Arc<B>, chat_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let (messages, _) = watch::channel(Vec::new());
        Self {
            backend,
            chat_id: chat_id.into(),
            user_id: user_id.into(),
            messages,
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Oldest first.
    pub fn query(&self) -> Query {
        Query::collection(collections::messages_of(&self.chat_id)).order_by("createdAt", Direction::Ascending)
    }

    pub fn messages(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.messages.subscribe()
    }

    pub fn start(&self) -> Subscription {
        let messages = self.messages.clone();
        let chat_id = self.chat_id.clone();

        self.backend.watch(
            self.query(),
            Box::new(move |docs| {
                messages.send_replace(readable_messages(&docs));
            }),
            Box::new(move |e| warn!(chat = %chat_id, error = %e, "chat room watch stopped")),
        )
    }

    /// Post a text message and bump the chat's preview fields.
    pub async fn send_text(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::Validation("Message is empty".into()));
        }

        let now = Utc::now();
        let message = ChatMessage {
            id: String::new(),
            text: Some(text.to_string()),
            media_url: None,
            author_id: self.user_id.clone(),
            is_read: false,
            created_at: now,
        };

        let id = self
            .backend
            .add(&collections::messages_of(&self.chat_id), to_fields(&message)?)
            .await?;

        let mut summary = Map::new();
        summary.insert("lastMessage".into(), text.into());
        summary.insert("updatedAt".into(), now.timestamp_millis().into());
        self.backend.update(collections::CHATS, &self.chat_id, summary).await?;

        info!(chat = %self.chat_id, id = %id, "message sent");
        Ok(id)
    }

    /// Mark every unread message from the other side as read. Returns how
    /// many were updated.
    pub async fn mark_read(&self) -> Result<usize> {
        let path = collections::messages_of(&self.chat_id);
        let unread = self
            .backend
            .query(&Query::collection(&path).filter(Filter::eq("isRead", false)))
            .await?;

        let mut marked = 0;
        for message in readable_messages(&unread) {
            if !message.is_unread_for(&self.user_id) {
                continue;
            }
            let mut fields = Map::new();
            fields.insert("isRead".into(), true.into());
            self.backend.update(&path, &message.id, fields).await?;
            marked += 1;
        }

        debug!(chat = %self.chat_id, marked, "messages marked read");
        Ok(marked)
    }
}

/// Decode message documents, skipping (and logging) any that don't parse.
pub fn readable_messages(docs: &[Document]) -> Vec<ChatMessage> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<ChatMessage>() {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping unreadable message");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use serde_json::json;

    use solace_types::models::ChatSession;

    use crate::error::ErrorAction;
    use crate::testing::{FlakyBackend, fields, local};

    async fn seeded() -> Arc<solace_gateway::LocalBackend> {
        let backend = local();
        backend
            .set(collections::CHATS, "c1", fields(json!({ "participants": ["u1", "u2"] })))
            .await
            .unwrap();
        Arc::new(backend)
    }

    #[tokio::test]
    async fn send_updates_thread_and_chat_summary() {
        let backend = seeded().await;
        let room = ChatRoom::new(backend.clone(), "c1", "u1");
        let mut rx = room.messages();
        let _sub = room.start();

        room.send_text("  hello  ").await.unwrap();

        let thread = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|m| m.len() == 1))
            .await
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(thread[0].text.as_deref(), Some("hello"));
        assert_eq!(thread[0].author_id, "u1");
        assert!(!thread[0].is_read);

        let chat: ChatSession = backend.get(collections::CHATS, "c1").await.unwrap().unwrap().decode().unwrap();
        assert_eq!(chat.last_message.as_deref(), Some("hello"));
        assert!(chat.updated_at.is_some());
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let backend = seeded().await;
        let room = ChatRoom::new(backend, "c1", "u1");

        let err = room.send_text("   ").await.unwrap_err();
        assert_eq!(err.action(), ErrorAction::Alert);
    }

    #[tokio::test]
    async fn mark_read_skips_own_messages() {
        let backend = seeded().await;
        let path = collections::messages_of("c1");
        for (author, at) in [("u2", 1), ("u2", 2), ("u1", 3)] {
            backend
                .add(&path, fields(json!({ "authorId": author, "isRead": false, "createdAt": at, "text": "hi" })))
                .await
                .unwrap();
        }

        let room = ChatRoom::new(backend.clone(), "c1", "u1");
        assert_eq!(room.mark_read().await.unwrap(), 2);
        assert_eq!(room.mark_read().await.unwrap(), 0);

        let still_unread = backend
            .query(&Query::collection(&path).filter(Filter::eq("isRead", false)))
            .await
            .unwrap();
        assert_eq!(still_unread.len(), 1);
    }

    #[tokio::test]
    async fn failed_send_surfaces_generic_alert() {
        let backend = Arc::new(FlakyBackend::new());
        backend.fail_writes.store(true, Ordering::SeqCst);
        let room = ChatRoom::new(backend, "c1", "u1");

        let err = room.send_text("hello").await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));
        assert_eq!(err.user_message(), crate::error::GENERIC_FAILURE);
    }
}
