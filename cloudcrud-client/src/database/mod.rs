//! Remote database backends.
//!
//! The [`RemoteDatabase`] trait is the only thing the CRUD client knows
//! about the backing store.

pub mod http;
pub mod memory;
pub mod remote;

pub use http::{DatabaseScope, HttpDatabase, HttpDatabaseConfig};
pub use memory::{MemoryDatabase, MemoryDatabaseConfig};
pub use remote::{FailedRecord, QueryBatch, RemoteDatabase};
