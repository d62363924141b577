//! Remote database abstraction trait.

use crate::error::ClientResult;
use async_trait::async_trait;
use cloudcrud_types::{PageCursor, QuerySpec, RawRemoteRecord, RecordId};

/// A record the server matched but could not return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    /// The record's id, when the server reported one.
    pub id: Option<RecordId>,
    /// Server-provided reason.
    pub reason: String,
}

/// One bounded page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryBatch {
    /// Matched records, in server order.
    pub records: Vec<RawRemoteRecord>,
    /// Per-record failures inside an otherwise successful page.
    pub failed: Vec<FailedRecord>,
    /// Present when more results are available.
    pub cursor: Option<PageCursor>,
}

/// Abstract record database interface.
#[async_trait]
pub trait RemoteDatabase: Send + Sync {
    /// Returns a short name for the backend, used in logs.
    fn name(&self) -> &'static str;

    /// Runs a query and returns its first page.
    async fn query(&self, record_type: &str, spec: &QuerySpec) -> ClientResult<QueryBatch>;

    /// Returns the page following `cursor`. The cursor carries the original
    /// predicate, sort order and page size.
    async fn query_continuation(&self, cursor: &PageCursor) -> ClientResult<QueryBatch>;

    /// Creates or replaces a record. A record without an id is created
    /// under a new id. Returns the record as stored.
    async fn upsert(&self, record: RawRemoteRecord) -> ClientResult<RawRemoteRecord>;

    /// Removes a record. Fails with `NotFound` if the id does not exist.
    async fn delete_by_id(&self, id: &RecordId) -> ClientResult<()>;
}
