//! Live chat list: one preview per chat the user takes part in.
//!
//! Every snapshot of the user's chats starts a rebuild that resolves the
//! counterpart's name, the latest message and the unread count, one chat at
//! a time. Rebuilds can overlap; each takes a sequence number when its
//! snapshot arrives and is only applied if no newer snapshot has arrived
//! since. The list is replaced as a whole, never patched.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, warn};

use solace_gateway::{Backend, Subscription};
use solace_types::api::ChatPreview;
use solace_types::models::{ChatMessage, ChatSession, UserProfile, collections};
use solace_types::{Direction, Document, Filter, Query};

use crate::chat_room::readable_messages;
use crate::error::{ClientError, Result};

pub const UNKNOWN_USER: &str = "Unknown user";
pub const NO_MESSAGES: &str = "No messages yet";
pub const MEDIA_PREVIEW: &str = "Photo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListState {
    pub previews: Vec<ChatPreview>,
    /// True until the first rebuild finishes.
    pub loading: bool,
    /// Set when the last applied rebuild or the watch failed.
    pub alert: Option<String>,
    /// Sequence number of the rebuild currently shown.
    pub applied: u64,
}

impl Default for ChatListState {
    fn default() -> Self {
        Self {
            previews: Vec::new(),
            loading: true,
            alert: None,
            applied: 0,
        }
    }
}

pub struct ChatList<B: Backend> {
    inner: Arc<Inner<B>>,
}

struct Inner<B> {
    backend: Arc<B>,
    user_id: String,
    latest: AtomicU64,
    state: watch::Sender<ChatListState>,
}

impl<B: Backend> Clone for ChatList<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Backend> ChatList<B> {
    pub fn new(backend: Arc<B>, user_id: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ChatListState::default());
        Self {
            inner: Arc::new(Inner {
                backend,
                user_id: user_id.into(),
                latest: AtomicU64::new(0),
                state,
            }),
        }
    }

    /// Chats the user takes part in.
    pub fn query(&self) -> Query {
        Query::collection(collections::CHATS).filter(Filter::array_contains("participants", self.inner.user_id.as_str()))
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatListState> {
        self.inner.state.subscribe()
    }

    pub fn current(&self) -> ChatListState {
        self.inner.state.borrow().clone()
    }

    /// Watch the user's chats and rebuild on every snapshot.
    pub fn start(&self) -> Subscription {
        let list = self.clone();
        let failed = self.clone();

        self.inner.backend.watch(
            self.query(),
            Box::new(move |chats| {
                let seq = list.next_sequence();
                let list = list.clone();
                tokio::spawn(async move {
                    list.rebuild(seq, chats).await;
                });
            }),
            Box::new(move |e| failed.watch_failed(e.into())),
        )
    }

    /// Claim the sequence number for a newly arrived snapshot.
    pub fn next_sequence(&self) -> u64 {
        self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Build previews for `chats` and apply them if `seq` is still the
    /// latest snapshot. Returns whether the result was applied.
    ///
    /// A failed build keeps the previous previews and raises the alert.
    pub async fn rebuild(&self, seq: u64, chats: Vec<Document>) -> bool {
        let inner = &self.inner;
        let result = build_previews(inner.backend.as_ref(), &inner.user_id, &chats).await;

        inner.state.send_if_modified(|state| {
            if seq != inner.latest.load(Ordering::SeqCst) || seq <= state.applied {
                debug!(seq, applied = state.applied, "discarding stale chat list rebuild");
                return false;
            }

            state.applied = seq;
            state.loading = false;
            match result {
                Ok(previews) => {
                    state.previews = previews;
                    state.alert = None;
                }
                Err(e) => {
                    warn!(seq, error = %e, "chat list rebuild failed");
                    state.alert = Some(e.user_message());
                }
            }
            true
        })
    }

    fn watch_failed(&self, err: ClientError) {
        warn!(user = %self.inner.user_id, error = %err, "chat list watch stopped");
        self.inner.state.send_modify(|state| {
            state.loading = false;
            state.alert = Some(err.user_message());
        });
    }
}

/// Assemble one preview per chat, in the order given. Any failed lookup
/// aborts the whole build; unreadable messages are only skipped.
pub async fn build_previews<B: Backend>(backend: &B, user_id: &str, chats: &[Document]) -> Result<Vec<ChatPreview>> {
    let mut previews = Vec::with_capacity(chats.len());

    for doc in chats {
        let chat: ChatSession = doc.decode()?;
        let other_user_id = chat.counterpart(user_id).map(str::to_string);

        let other_user_name = match &other_user_id {
            Some(other) => resolve_name(backend, other).await?,
            None => UNKNOWN_USER.to_string(),
        };

        let messages = collections::messages_of(&chat.id);

        let latest = backend
            .query(&Query::collection(&messages).order_by("createdAt", Direction::Descending).limit(1))
            .await?;
        let last_message = match readable_messages(&latest).first() {
            Some(message) => preview_text(message),
            None => NO_MESSAGES.to_string(),
        };

        let unread = backend
            .query(&Query::collection(&messages).filter(Filter::eq("isRead", false)))
            .await?;
        let unread = readable_messages(&unread);

        previews.push(ChatPreview {
            chat_id: chat.id,
            other_user_id,
            other_user_name,
            last_message,
            unread_count: unread_count(&unread, user_id),
        });
    }

    Ok(previews)
}

/// Messages not yet read by `user_id`. Their own messages never count.
pub fn unread_count(messages: &[ChatMessage], user_id: &str) -> usize {
    messages.iter().filter(|m| m.is_unread_for(user_id)).count()
}

pub fn preview_text(message: &ChatMessage) -> String {
    match (&message.text, &message.media_url) {
        (Some(text), _) if !text.trim().is_empty() => text.clone(),
        (_, Some(_)) => MEDIA_PREVIEW.to_string(),
        _ => String::new(),
    }
}

async fn resolve_name<B: Backend>(backend: &B, user_id: &str) -> Result<String> {
    let profile = backend.get(collections::PROFILES, user_id).await?;
    let name = profile
        .map(|doc| doc.decode::<UserProfile>())
        .transpose()?
        .and_then(|p| p.display_name());

    Ok(name.unwrap_or_else(|| UNKNOWN_USER.to_string()))
}
