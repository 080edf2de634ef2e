//! Test helpers: an in-memory backend and a wrapper that can fail or stall
//! on demand.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use serde_json::{Map, Value};

use solace_gateway::{Backend, ErrorHandler, LocalBackend, SnapshotHandler, Subscription};
use solace_types::{Document, Query};

pub fn local() -> LocalBackend {
    LocalBackend::in_memory().unwrap()
}

pub fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// Delegates to a [`LocalBackend`], counting writes and failing reads or
/// writes when told to. Watches are never failed.
pub struct FlakyBackend {
    pub inner: LocalBackend,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub write_delay_ms: AtomicU64,
    pub writes: AtomicUsize,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self {
            inner: local(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            write_delay_ms: AtomicU64::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("read refused");
        }
        Ok(())
    }

    async fn before_write(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("write refused");
        }
        Ok(())
    }
}

impl Backend for FlakyBackend {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check_read()?;
        self.inner.get(collection, id).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.check_read()?;
        self.inner.query(query).await
    }

    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        self.before_write().await?;
        self.inner.add(collection, fields).await
    }

    async fn set(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        self.before_write().await?;
        self.inner.set(collection, id, fields).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        self.before_write().await?;
        self.inner.update(collection, id, fields).await
    }

    fn watch(&self, query: Query, on_snapshot: SnapshotHandler, on_error: ErrorHandler) -> Subscription {
        self.inner.watch(query, on_snapshot, on_error)
    }
}
