//! Shared store test helpers: a sample entity and an observable database.

#![allow(dead_code)]

use async_trait::async_trait;
use cloudcrud_client::{
    ClientError, ClientResult, MemoryDatabase, MemoryDatabaseConfig, QueryBatch, RemoteDatabase,
};
use cloudcrud_model::{
    ensure_record_type, require_bool, require_i64, require_str, DecodeResult, RecordCodec,
};
use cloudcrud_store::CollectionState;
use cloudcrud_types::{PageCursor, QuerySpec, RawRemoteRecord, RecordId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, OwnedMutexGuard};
use tracing_subscriber::EnvFilter;

/// Routes library logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Sample entity ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Option<RecordId>,
    pub title: String,
    pub priority: i64,
    pub done: bool,
}

impl RecordCodec for Task {
    const RECORD_TYPE: &'static str = "Task";

    fn decode(record: &RawRemoteRecord) -> DecodeResult<Self> {
        ensure_record_type::<Self>(record)?;
        Ok(Self {
            id: record.id.clone(),
            title: require_str(record, "title")?.to_string(),
            priority: require_i64(record, "priority")?,
            done: require_bool(record, "done")?,
        })
    }

    fn encode(&self) -> RawRemoteRecord {
        RawRemoteRecord::new(Self::RECORD_TYPE)
            .with_id(self.id.clone())
            .with_field("title", self.title.as_str())
            .with_field("priority", self.priority)
            .with_field("done", self.done)
    }
}

/// An unsaved task.
pub fn task(title: &str, priority: i64) -> Task {
    Task {
        id: None,
        title: title.to_string(),
        priority,
        done: false,
    }
}

/// Saves `count` tasks named `task-0..` with ascending priorities.
pub async fn seed(database: &MemoryDatabase, count: usize) {
    for i in 0..count {
        let record = task(&format!("task-{i}"), i as i64).encode();
        database.upsert(record).await.unwrap();
    }
}

// ── Observable database ─────────────────────────────────────────

/// One database call as seen by [`ScriptedDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub operation: &'static str,
    /// The watched store's loading flag when the call arrived.
    pub store_loading: Option<bool>,
}

/// Wraps a [`MemoryDatabase`] with failure injection and call accounting.
pub struct ScriptedDatabase {
    pub inner: MemoryDatabase,
    fail_query: AtomicBool,
    fail_writes: AtomicBool,
    page_requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<Call>>,
    watched: Mutex<Option<watch::Receiver<CollectionState<Task>>>>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl ScriptedDatabase {
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    pub fn with_page_size(default_page_size: usize) -> Self {
        Self {
            inner: MemoryDatabase::new(MemoryDatabaseConfig {
                default_page_size,
                ..MemoryDatabaseConfig::default()
            }),
            fail_query: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            page_requests: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            watched: Mutex::new(None),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Clears the call log and records the store's loading flag on every
    /// later call.
    pub fn watch_store(&self, state: watch::Receiver<CollectionState<Task>>) {
        self.calls.lock().unwrap().clear();
        *self.watched.lock().unwrap() = Some(state);
    }

    /// Every call so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Blocks every database call until the returned guard is dropped.
    pub async fn hold(&self) -> OwnedMutexGuard<()> {
        self.gate.clone().lock_owned().await
    }

    /// Waits for the gate, then yields while counted as in flight so
    /// overlapping callers can interleave.
    async fn enter(&self, operation: &'static str) {
        drop(self.gate.lock().await);

        let store_loading = self
            .watched
            .lock()
            .unwrap()
            .as_ref()
            .map(|state| state.borrow().is_loading);
        self.calls.lock().unwrap().push(Call {
            operation,
            store_loading,
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteDatabase for ScriptedDatabase {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn query(&self, record_type: &str, spec: &QuerySpec) -> ClientResult<QueryBatch> {
        self.enter("query").await;
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_query.load(Ordering::SeqCst) {
            Err(ClientError::Network("connection reset".to_string()))
        } else {
            self.inner.query(record_type, spec).await
        };
        self.exit();
        result
    }

    async fn query_continuation(&self, cursor: &PageCursor) -> ClientResult<QueryBatch> {
        self.enter("query_continuation").await;
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.query_continuation(cursor).await;
        self.exit();
        result
    }

    async fn upsert(&self, record: RawRemoteRecord) -> ClientResult<RawRemoteRecord> {
        self.enter("upsert").await;
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(ClientError::Network("connection reset".to_string()))
        } else {
            self.inner.upsert(record).await
        };
        self.exit();
        result
    }

    async fn delete_by_id(&self, id: &RecordId) -> ClientResult<()> {
        self.enter("delete_by_id").await;
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(ClientError::Network("connection reset".to_string()))
        } else {
            self.inner.delete_by_id(id).await
        };
        self.exit();
        result
    }
}
