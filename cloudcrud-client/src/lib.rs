//! Generic CRUD client over remote record databases.
//!
//! # Architecture
//!
//! - [`RemoteDatabase`] is the boundary to the backing store: paged queries,
//!   upsert, and delete by id. Implementations are injected, never global.
//! - [`RemoteCrudClient`] is generic over any [`RecordCodec`] entity. It walks
//!   every page of a query, decodes records, and skips the ones that fail.
//! - Two backends ship with the crate: [`MemoryDatabase`] for tests and
//!   offline use, and [`HttpDatabase`] for a record web service.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cloudcrud_client::{MemoryDatabase, RemoteCrudClient};
//!
//! let database = Arc::new(MemoryDatabase::default());
//! let client = RemoteCrudClient::new(database);
//! assert_eq!(client.database_name(), "memory");
//! ```
//!
//! [`RecordCodec`]: cloudcrud_model::RecordCodec

mod client;
pub mod database;
mod error;

pub use client::RemoteCrudClient;
pub use database::{
    DatabaseScope, FailedRecord, HttpDatabase, HttpDatabaseConfig, MemoryDatabase,
    MemoryDatabaseConfig, QueryBatch, RemoteDatabase,
};
pub use error::{ClientError, ClientResult};
