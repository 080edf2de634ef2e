use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use tracing::{debug, error};
use uuid::Uuid;

use solace_db::Database;
use solace_types::events::{ChangeEvent, ChangeKind};
use solace_types::{Document, Query};

use crate::dispatcher::Dispatcher;
use crate::watcher::{self, ErrorHandler, SnapshotHandler, Subscription};

/// The document backend the client logic runs against: point reads,
/// queries, writes and live watches.
pub trait Backend: Send + Sync + 'static {
    fn get(&self, collection: &str, id: &str) -> impl Future<Output = Result<Option<Document>>> + Send;

    fn query(&self, query: &Query) -> impl Future<Output = Result<Vec<Document>>> + Send;

    /// Create a document with a generated id. Returns the id.
    fn add(&self, collection: &str, fields: Map<String, Value>) -> impl Future<Output = Result<String>> + Send;

    /// Create or replace a document.
    fn set(&self, collection: &str, id: &str, fields: Map<String, Value>) -> impl Future<Output = Result<()>> + Send;

    /// Merge fields into an existing document.
    fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> impl Future<Output = Result<()>> + Send;

    /// Deliver the full result set of `query` now and after every change.
    fn watch(&self, query: Query, on_snapshot: SnapshotHandler, on_error: ErrorHandler) -> Subscription;
}

/// [`Backend`] over the local SQLite store, publishing a change event after
/// every write.
#[derive(Clone)]
pub struct LocalBackend {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl LocalBackend {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run a blocking store call off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                anyhow!("store task failed: {}", e)
            })?
    }
}

impl Backend for LocalBackend {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.blocking(move |db| db.get_document(&collection, &id)?.map(|row| row.into_document()).transpose())
            .await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        let collection = query.collection.clone();
        let docs = self
            .blocking(move |db| {
                db.list_documents(&collection)?
                    .into_iter()
                    .map(|row| row.into_document())
                    .collect::<Result<Vec<_>>>()
            })
            .await?;

        Ok(query.apply(docs))
    }

    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let (coll, doc_id) = (collection.to_string(), id.clone());
        self.blocking(move |db| db.insert_document(&coll, &doc_id, &fields)).await?;

        debug!(collection, id = %id, "document added");
        self.dispatcher.broadcast(ChangeEvent::new(collection, id.clone(), ChangeKind::Added));
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let (coll, doc_id) = (collection.to_string(), id.to_string());
        let existed = self.blocking(move |db| db.set_document(&coll, &doc_id, &fields)).await?;

        let kind = if existed { ChangeKind::Modified } else { ChangeKind::Added };
        self.dispatcher.broadcast(ChangeEvent::new(collection, id, kind));
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let (coll, doc_id) = (collection.to_string(), id.to_string());
        self.blocking(move |db| db.merge_document(&coll, &doc_id, &fields)).await?;

        self.dispatcher.broadcast(ChangeEvent::new(collection, id, ChangeKind::Modified));
        Ok(())
    }

    fn watch(&self, query: Query, on_snapshot: SnapshotHandler, on_error: ErrorHandler) -> Subscription {
        let backend = self.clone();
        watcher::spawn(
            &self.dispatcher,
            query,
            move |q| {
                let backend = backend.clone();
                async move { backend.query(&q).await }
            },
            on_snapshot,
            on_error,
        )
    }
}
