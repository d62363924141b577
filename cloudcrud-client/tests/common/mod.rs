//! Shared test helpers: a sample entity and a scriptable database.

#![allow(dead_code)]

use async_trait::async_trait;
use cloudcrud_client::{
    ClientError, ClientResult, FailedRecord, MemoryDatabase, MemoryDatabaseConfig, QueryBatch,
    RemoteDatabase,
};
use cloudcrud_model::{
    ensure_record_type, require_bool, require_i64, require_str, DecodeResult, RecordCodec,
};
use cloudcrud_types::{PageCursor, QuerySpec, RawRemoteRecord, RecordId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
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

/// A raw Task record that cannot be decoded (missing `priority`).
pub fn broken_task_record(title: &str) -> RawRemoteRecord {
    RawRemoteRecord::new(Task::RECORD_TYPE)
        .with_id(Some(RecordId::new()))
        .with_field("title", title)
        .with_field("done", false)
}

/// Saves `count` tasks named `task-0..` with ascending priorities.
pub async fn seed(database: &MemoryDatabase, count: usize) {
    for i in 0..count {
        let record = task(&format!("task-{i}"), i as i64).encode();
        database.upsert(record).await.unwrap();
    }
}

// ── Scriptable database ─────────────────────────────────────────

/// Wraps a [`MemoryDatabase`] with failure injection and request accounting.
pub struct ScriptedDatabase {
    pub inner: MemoryDatabase,
    fail_query: AtomicBool,
    /// Fail the n-th continuation request (1-based).
    fail_continuation_at: Mutex<Option<usize>>,
    fail_writes: AtomicBool,
    failed_entries: Mutex<Vec<FailedRecord>>,
    continuations: AtomicUsize,
    page_requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
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
            fail_continuation_at: Mutex::new(None),
            fail_writes: AtomicBool::new(false),
            failed_entries: Mutex::new(Vec::new()),
            continuations: AtomicUsize::new(0),
            page_requests: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn fail_continuation_at(&self, n: usize) {
        *self.fail_continuation_at.lock().unwrap() = Some(n);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reports `failure` alongside the records of the next first page.
    pub fn report_failed_record(&self, failure: FailedRecord) {
        self.failed_entries.lock().unwrap().push(failure);
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Blocks every database call until the returned guard is dropped.
    pub async fn hold(&self) -> OwnedMutexGuard<()> {
        self.gate.clone().lock_owned().await
    }

    /// Waits for the gate, then yields while counted as in flight so
    /// overlapping callers can interleave.
    async fn enter(&self) {
        drop(self.gate.lock().await);
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
        self.enter().await;
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_query.load(Ordering::SeqCst) {
            Err(ClientError::Network("connection reset".to_string()))
        } else {
            self.inner.query(record_type, spec).await.map(|mut batch| {
                batch.failed = std::mem::take(&mut *self.failed_entries.lock().unwrap());
                batch
            })
        };
        self.exit();
        result
    }

    async fn query_continuation(&self, cursor: &PageCursor) -> ClientResult<QueryBatch> {
        self.enter().await;
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        let n = self.continuations.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_at = *self.fail_continuation_at.lock().unwrap();
        let result = if fail_at == Some(n) {
            Err(ClientError::Server {
                status: 503,
                message: "service unavailable".to_string(),
            })
        } else {
            self.inner.query_continuation(cursor).await
        };
        self.exit();
        result
    }

    async fn upsert(&self, record: RawRemoteRecord) -> ClientResult<RawRemoteRecord> {
        self.enter().await;
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(ClientError::Network("connection reset".to_string()))
        } else {
            self.inner.upsert(record).await
        };
        self.exit();
        result
    }

    async fn delete_by_id(&self, id: &RecordId) -> ClientResult<()> {
        self.enter().await;
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(ClientError::Network("connection reset".to_string()))
        } else {
            self.inner.delete_by_id(id).await
        };
        self.exit();
        result
    }
}
