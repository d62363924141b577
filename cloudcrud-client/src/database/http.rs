//! Record web service backend.
//!
//! Speaks JSON over HTTPS to a record database laid out as
//! `{api_base_url}/database/1/{container}/{environment}/{scope}/records/...`.
//! Queries go to `records/query`, writes and deletes to `records/modify`.

use super::remote::{FailedRecord, QueryBatch, RemoteDatabase};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cloudcrud_types::{
    FieldValue, Filter, PageCursor, QuerySpec, RawRemoteRecord, RecordId, SortDescriptor,
};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Which database of a container the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseScope {
    #[default]
    Public,
    Private,
    Shared,
}

impl fmt::Display for DatabaseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self {
            DatabaseScope::Public => "public",
            DatabaseScope::Private => "private",
            DatabaseScope::Shared => "shared",
        };
        f.write_str(scope)
    }
}

/// HTTP backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpDatabaseConfig {
    /// Base URL of the record web service.
    pub api_base_url: String,
    /// Container identifier, e.g. `iCloud.com.example.app`.
    pub container: String,
    /// `development` or `production`.
    pub environment: String,
    pub scope: DatabaseScope,
    /// API token sent as the `ckAPIToken` query parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Per-request transport timeout.
    pub timeout_secs: u64,
}

impl Default for HttpDatabaseConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.apple-cloudkit.com".to_string(),
            container: String::new(),
            environment: "development".to_string(),
            scope: DatabaseScope::Public,
            api_token: None,
            timeout_secs: 60,
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuery {
    record_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    filter_by: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sort_by: Vec<SortDescriptor>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a WireQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    results_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    continuation_marker: Option<&'a str>,
}

/// What a [`PageCursor`] issued by this backend decodes to.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Continuation {
    query: WireQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    results_limit: Option<usize>,
    marker: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    records: Vec<WireRecord>,
    continuation_marker: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    record_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    record_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, FieldValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    server_error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyOperation {
    operation_type: &'static str,
    record: WireRecord,
}

#[derive(Debug, Serialize)]
struct ModifyRequest {
    operations: Vec<ModifyOperation>,
}

#[derive(Debug, Deserialize)]
struct ModifyResponse {
    #[serde(default)]
    records: Vec<WireRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    server_error_code: Option<String>,
    reason: Option<String>,
}

impl WireRecord {
    fn from_record(record: RawRemoteRecord) -> Self {
        Self {
            record_name: record.id.map(|id| id.as_str().to_string()),
            record_type: Some(record.record_type),
            fields: Some(record.fields),
            ..Default::default()
        }
    }

    fn record_id(&self) -> Option<RecordId> {
        self.record_name
            .as_deref()
            .and_then(|name| RecordId::parse(name).ok())
    }

    /// Converts a successful entry, or reports its per-record failure.
    fn into_record(self) -> Result<RawRemoteRecord, FailedRecord> {
        let id = self.record_id();
        if let Some(code) = self.server_error_code {
            let reason = match self.reason {
                Some(reason) => format!("{code}: {reason}"),
                None => code,
            };
            return Err(FailedRecord { id, reason });
        }

        let Some(record_type) = self.record_type else {
            return Err(FailedRecord {
                id,
                reason: "record entry has no recordType".to_string(),
            });
        };

        Ok(RawRemoteRecord {
            record_type,
            id,
            fields: self.fields.unwrap_or_default(),
        })
    }
}

fn encode_cursor(continuation: &Continuation) -> ClientResult<PageCursor> {
    let json = serde_json::to_vec(continuation)?;
    Ok(PageCursor::new(URL_SAFE_NO_PAD.encode(json)))
}

fn decode_cursor(cursor: &PageCursor) -> ClientResult<Continuation> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.as_str())
        .map_err(|e| ClientError::InvalidCursor(format!("not base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::InvalidCursor(format!("malformed continuation: {e}")))
}

/// Maps a per-record server error code onto the client's error type.
fn record_error(code: &str, reason: Option<String>, id: &str) -> ClientError {
    match code {
        "NOT_FOUND" | "UNKNOWN_ITEM" => ClientError::NotFound(id.to_string()),
        _ => ClientError::Server {
            status: 200,
            message: match reason {
                Some(reason) => format!("{code}: {reason}"),
                None => code.to_string(),
            },
        },
    }
}

/// [`RemoteDatabase`] backed by a record web service.
pub struct HttpDatabase {
    config: HttpDatabaseConfig,
    client: Client,
}

impl HttpDatabase {
    /// Creates a new HTTP database client.
    pub fn new(config: HttpDatabaseConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/database/1/{}/{}/{}/records/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.container,
            self.config.environment,
            self.config.scope,
            operation
        )
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        body: &B,
    ) -> ClientResult<Response> {
        let mut request = self.client.post(self.endpoint(operation)).json(body);
        if let Some(token) = &self.config.api_token {
            request = request.query(&[("ckAPIToken", token.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("{operation} request failed: {e}")))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = match (body.server_error_code, body.reason) {
            (Some(code), Some(reason)) => format!("{code}: {reason}"),
            (Some(code), None) => code,
            (None, Some(reason)) => reason,
            (None, None) => text,
        };
        Err(ClientError::Server { status, message })
    }

    async fn run_query(
        &self,
        query: WireQuery,
        results_limit: Option<usize>,
        marker: Option<&str>,
    ) -> ClientResult<QueryBatch> {
        let request = QueryRequest {
            query: &query,
            results_limit,
            continuation_marker: marker,
        };
        let response: QueryResponse = self
            .post("query", &request)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Protocol(format!("failed to parse query response: {e}")))?;

        let mut records = Vec::with_capacity(response.records.len());
        let mut failed = Vec::new();
        for entry in response.records {
            match entry.into_record() {
                Ok(record) => records.push(record),
                Err(failure) => failed.push(failure),
            }
        }

        let cursor = match response.continuation_marker {
            Some(marker) => Some(encode_cursor(&Continuation {
                query,
                results_limit,
                marker,
            })?),
            None => None,
        };

        debug!(
            "Query page returned {} records ({} failed), more: {}",
            records.len(),
            failed.len(),
            cursor.is_some()
        );
        Ok(QueryBatch {
            records,
            failed,
            cursor,
        })
    }

    /// Sends a single modify operation and returns the server's entry for it.
    async fn modify(&self, operation: ModifyOperation, id_hint: &str) -> ClientResult<WireRecord> {
        let request = ModifyRequest {
            operations: vec![operation],
        };
        let response: ModifyResponse = self
            .post("modify", &request)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Protocol(format!("failed to parse modify response: {e}")))?;

        let entry = response
            .records
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Protocol("modify response has no records".to_string()))?;

        if let Some(code) = &entry.server_error_code {
            return Err(record_error(code, entry.reason.clone(), id_hint));
        }
        Ok(entry)
    }
}

#[async_trait]
impl RemoteDatabase for HttpDatabase {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn query(&self, record_type: &str, spec: &QuerySpec) -> ClientResult<QueryBatch> {
        let query = WireQuery {
            record_type: record_type.to_string(),
            filter_by: spec.predicate.filters().to_vec(),
            sort_by: spec.sort.clone(),
        };
        self.run_query(query, spec.results_limit, None).await
    }

    async fn query_continuation(&self, cursor: &PageCursor) -> ClientResult<QueryBatch> {
        let continuation = decode_cursor(cursor)?;
        self.run_query(
            continuation.query,
            continuation.results_limit,
            Some(&continuation.marker),
        )
        .await
    }

    async fn upsert(&self, record: RawRemoteRecord) -> ClientResult<RawRemoteRecord> {
        let operation_type = if record.id.is_some() {
            "forceReplace"
        } else {
            "create"
        };
        let id_hint = record
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default();
        let original_id = record.id.clone();
        let record_type = record.record_type.clone();
        let sent_fields = record.fields.clone();

        let entry = self
            .modify(
                ModifyOperation {
                    operation_type,
                    record: WireRecord::from_record(record),
                },
                &id_hint,
            )
            .await?;

        let saved = RawRemoteRecord {
            record_type: entry.record_type.clone().unwrap_or(record_type),
            id: entry.record_id().or(original_id),
            fields: entry.fields.unwrap_or(sent_fields),
        };
        info!(
            "Saved {} record {:?} via {}",
            saved.record_type, saved.id, operation_type
        );
        Ok(saved)
    }

    async fn delete_by_id(&self, id: &RecordId) -> ClientResult<()> {
        let record = WireRecord {
            record_name: Some(id.as_str().to_string()),
            ..Default::default()
        };
        self.modify(
            ModifyOperation {
                operation_type: "forceDelete",
                record,
            },
            id.as_str(),
        )
        .await?;

        info!("Deleted record {}", id);
        Ok(())
    }
}
