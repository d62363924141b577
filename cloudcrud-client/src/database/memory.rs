//! In-process record database.
//!
//! Keeps records in insertion order and evaluates predicates and sort
//! descriptors locally. Cursors refer to a snapshot of the matched ids
//! taken when the query started; records deleted between pages are
//! skipped, records added between pages are not picked up. At most
//! `max_open_cursors` snapshots are kept; issuing one more evicts the
//! oldest, whose cursor then fails with `InvalidCursor`.

use super::remote::{QueryBatch, RemoteDatabase};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use cloudcrud_types::{PageCursor, QuerySpec, RawRemoteRecord, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Configuration for the in-memory database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDatabaseConfig {
    /// Page size used when a query does not set `results_limit`.
    pub default_page_size: usize,
    /// Snapshots kept for unfinished queries.
    #[serde(default = "default_max_open_cursors")]
    pub max_open_cursors: usize,
}

fn default_max_open_cursors() -> usize {
    256
}

impl Default for MemoryDatabaseConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_open_cursors: default_max_open_cursors(),
        }
    }
}

/// Remaining ids of a query in progress.
#[derive(Debug)]
struct PendingQuery {
    ids: Vec<RecordId>,
    offset: usize,
    page_size: usize,
    /// Issue order, used to evict the oldest snapshot.
    issued: u64,
}

/// In-memory [`RemoteDatabase`].
pub struct MemoryDatabase {
    config: MemoryDatabaseConfig,
    records: RwLock<Vec<RawRemoteRecord>>,
    pending: Mutex<HashMap<String, PendingQuery>>,
    issued: AtomicU64,
}

impl MemoryDatabase {
    /// Creates an empty database.
    pub fn new(config: MemoryDatabaseConfig) -> Self {
        Self {
            config,
            records: RwLock::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            issued: AtomicU64::new(0),
        }
    }

    /// Returns the stored records of one type, in insertion order.
    pub async fn records_of_type(&self, record_type: &str) -> Vec<RawRemoteRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.record_type == record_type)
            .cloned()
            .collect()
    }

    /// Returns the total number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Returns the number of queries with pages still outstanding.
    pub async fn open_cursors(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Serves the next page of `pending` and re-registers it if more remain.
    async fn next_page(&self, mut pending: PendingQuery) -> QueryBatch {
        let end = (pending.offset + pending.page_size).min(pending.ids.len());
        let page_ids = &pending.ids[pending.offset..end];

        let records = {
            let stored = self.records.read().await;
            page_ids
                .iter()
                .filter_map(|id| stored.iter().find(|r| r.id.as_ref() == Some(id)).cloned())
                .collect()
        };
        pending.offset = end;

        let cursor = if pending.offset < pending.ids.len() {
            let token = Uuid::new_v4().to_string();
            pending.issued = self.issued.fetch_add(1, Ordering::Relaxed);
            let mut open = self.pending.lock().await;
            while !open.is_empty() && open.len() >= self.config.max_open_cursors.max(1) {
                let oldest = open
                    .iter()
                    .min_by_key(|(_, p)| p.issued)
                    .map(|(token, _)| token.clone());
                let Some(oldest) = oldest else { break };
                debug!("Evicting abandoned memory cursor {}", oldest);
                open.remove(&oldest);
            }
            open.insert(token.clone(), pending);
            Some(PageCursor::new(token))
        } else {
            None
        };

        QueryBatch {
            records,
            failed: Vec::new(),
            cursor,
        }
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new(MemoryDatabaseConfig::default())
    }
}

#[async_trait]
impl RemoteDatabase for MemoryDatabase {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn query(&self, record_type: &str, spec: &QuerySpec) -> ClientResult<QueryBatch> {
        let mut matched: Vec<RawRemoteRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.record_type == record_type && spec.predicate.matches(r))
            .cloned()
            .collect();
        // Stable sort keeps insertion order among ties.
        matched.sort_by(|a, b| spec.compare_records(a, b));

        let page_size = spec
            .results_limit
            .unwrap_or(self.config.default_page_size)
            .max(1);
        debug!(
            "Memory query matched {} {} records, page size {}",
            matched.len(),
            record_type,
            page_size
        );

        let pending = PendingQuery {
            ids: matched.into_iter().filter_map(|r| r.id).collect(),
            offset: 0,
            page_size,
            issued: 0,
        };
        Ok(self.next_page(pending).await)
    }

    async fn query_continuation(&self, cursor: &PageCursor) -> ClientResult<QueryBatch> {
        let pending = self
            .pending
            .lock()
            .await
            .remove(cursor.as_str())
            .ok_or_else(|| ClientError::InvalidCursor(cursor.as_str().to_string()))?;
        Ok(self.next_page(pending).await)
    }

    async fn upsert(&self, mut record: RawRemoteRecord) -> ClientResult<RawRemoteRecord> {
        let id = record.id.get_or_insert_with(RecordId::new).clone();
        let mut stored = self.records.write().await;

        match stored.iter_mut().find(|r| r.id.as_ref() == Some(&id)) {
            Some(existing) => *existing = record.clone(),
            None => stored.push(record.clone()),
        }
        Ok(record)
    }

    async fn delete_by_id(&self, id: &RecordId) -> ClientResult<()> {
        let mut stored = self.records.write().await;
        let position = stored
            .iter()
            .position(|r| r.id.as_ref() == Some(id))
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;
        stored.remove(position);
        Ok(())
    }
}
