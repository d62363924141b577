//! Generic CRUD operations over any [`RecordCodec`] entity.

use crate::database::{FailedRecord, RemoteDatabase};
use crate::error::{ClientError, ClientResult};
use cloudcrud_model::RecordCodec;
use cloudcrud_types::{QuerySpec, RawRemoteRecord, RecordId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stateless CRUD facade over an injected [`RemoteDatabase`].
///
/// Cloning is cheap; clones share the same database handle.
#[derive(Clone)]
pub struct RemoteCrudClient {
    database: Arc<dyn RemoteDatabase>,
}

impl RemoteCrudClient {
    /// Creates a client over the given database.
    pub fn new(database: Arc<dyn RemoteDatabase>) -> Self {
        Self { database }
    }

    /// Returns the backend name.
    pub fn database_name(&self) -> &'static str {
        self.database.name()
    }

    /// Fetches every record of `record_type` matching `spec`.
    ///
    /// Pages are requested one after another until the database stops
    /// returning a cursor; `spec.results_limit` bounds each page, not the
    /// total. Records that fail to decode are logged and skipped. If any
    /// page request fails, the whole fetch fails and nothing is returned.
    pub async fn fetch<T: RecordCodec>(
        &self,
        record_type: &str,
        spec: &QuerySpec,
    ) -> ClientResult<Vec<T>> {
        debug!(
            "Querying {} records from {} (page size {:?})",
            record_type,
            self.database.name(),
            spec.results_limit
        );

        let mut items = Vec::new();
        let mut batch = self.database.query(record_type, spec).await?;
        let mut pages = 1usize;

        loop {
            Self::collect_page(&mut items, batch.records, &batch.failed);

            match batch.cursor {
                Some(cursor) => {
                    debug!("Fetching page {} of {} records", pages + 1, record_type);
                    batch = self.database.query_continuation(&cursor).await?;
                    pages += 1;
                }
                None => break,
            }
        }

        debug!(
            "Fetched {} {} records in {} page(s)",
            items.len(),
            record_type,
            pages
        );
        Ok(items)
    }

    /// Fetches every `T` matching `spec`, scoped to `T::RECORD_TYPE`.
    pub async fn fetch_all<T: RecordCodec>(&self, spec: &QuerySpec) -> ClientResult<Vec<T>> {
        self.fetch(T::RECORD_TYPE, spec).await
    }

    /// Creates or updates the entity's record and returns its id.
    ///
    /// An entity that already carries an id is replaced in place.
    pub async fn save_or_update<T: RecordCodec>(&self, item: &T) -> ClientResult<RecordId> {
        let record = item.encode();
        let is_new = record.id.is_none();

        let saved = self.database.upsert(record).await?;
        let id = saved.id.ok_or_else(|| {
            ClientError::Protocol("database returned a saved record without an id".to_string())
        })?;

        if is_new {
            info!("Created {} record {}", T::RECORD_TYPE, id);
        } else {
            info!("Updated {} record {}", T::RECORD_TYPE, id);
        }
        Ok(id)
    }

    /// Deletes the entity's record.
    pub async fn delete<T: RecordCodec>(&self, item: &T) -> ClientResult<()> {
        let id = item.record_id().ok_or(ClientError::MissingRecordId)?;
        self.database.delete_by_id(&id).await?;
        info!("Deleted {} record {}", T::RECORD_TYPE, id);
        Ok(())
    }

    fn collect_page<T: RecordCodec>(
        items: &mut Vec<T>,
        records: Vec<RawRemoteRecord>,
        failed: &[FailedRecord],
    ) {
        for failure in failed {
            warn!(
                "Skipping {} record {:?} the server could not return: {}",
                T::RECORD_TYPE,
                failure.id,
                failure.reason
            );
        }

        for record in records {
            match T::decode(&record) {
                Ok(item) => items.push(item),
                Err(e) => warn!(
                    "Failed to decode {} from record {:?}: {e}",
                    T::RECORD_TYPE,
                    record.id
                ),
            }
        }
    }
}
