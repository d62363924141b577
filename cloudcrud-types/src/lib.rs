//! Core type definitions for cloudcrud.
//!
//! This crate defines the backend-agnostic vocabulary shared by every
//! other crate in the workspace:
//! - Record identifiers ([`RecordId`])
//! - Typed field values ([`FieldValue`])
//! - The raw key/value record as stored remotely ([`RawRemoteRecord`])
//! - Query descriptions ([`QuerySpec`], [`Predicate`], [`SortDescriptor`])
//!   and the opaque continuation token ([`PageCursor`])
//!
//! Concrete entity types and their schemas belong to the application, not here.

mod ids;
mod query;
mod record;
mod value;

pub use ids::RecordId;
pub use query::{Comparator, Filter, PageCursor, Predicate, QuerySpec, SortDescriptor};
pub use record::RawRemoteRecord;
pub use value::FieldValue;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),
}
