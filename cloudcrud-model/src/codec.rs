use chrono::{DateTime, Utc};
use cloudcrud_types::{FieldValue, RawRemoteRecord, RecordId};

use crate::{DecodeError, DecodeResult};

/// Maps an application entity to and from its remote record.
///
/// Implemented once per entity type. Decoding may fail for a single record
/// without affecting the rest of a fetch; encoding always succeeds.
pub trait RecordCodec: Sized + Send + Sync + 'static {
    /// Remote record type this entity is stored as. Scopes every query.
    const RECORD_TYPE: &'static str;

    /// Builds an entity from a stored record.
    fn decode(record: &RawRemoteRecord) -> DecodeResult<Self>;

    /// Produces the record for this entity.
    ///
    /// Must be deterministic and must carry the entity's remote id when it
    /// has one, so saving an existing entity updates it in place.
    fn encode(&self) -> RawRemoteRecord;

    /// The entity's remote id, if it has been stored before.
    fn record_id(&self) -> Option<RecordId> {
        self.encode().id
    }
}

/// Fails unless the record is of the codec's type.
pub fn ensure_record_type<T: RecordCodec>(record: &RawRemoteRecord) -> DecodeResult<()> {
    if record.record_type == T::RECORD_TYPE {
        Ok(())
    } else {
        Err(DecodeError::RecordTypeMismatch {
            expected: T::RECORD_TYPE.to_string(),
            found: record.record_type.clone(),
        })
    }
}

fn require<'a, V>(
    record: &'a RawRemoteRecord,
    field: &str,
    expected: &'static str,
    extract: impl FnOnce(&'a FieldValue) -> Option<V>,
) -> DecodeResult<V> {
    let value = record
        .get(field)
        .ok_or_else(|| DecodeError::MissingField(field.to_string()))?;
    extract(value).ok_or_else(|| DecodeError::WrongType {
        field: field.to_string(),
        expected,
        found: value.kind(),
    })
}

pub fn require_str<'a>(record: &'a RawRemoteRecord, field: &str) -> DecodeResult<&'a str> {
    require(record, field, "string", FieldValue::as_str)
}

pub fn require_i64(record: &RawRemoteRecord, field: &str) -> DecodeResult<i64> {
    require(record, field, "int64", FieldValue::as_i64)
}

pub fn require_f64(record: &RawRemoteRecord, field: &str) -> DecodeResult<f64> {
    require(record, field, "double", FieldValue::as_f64)
}

pub fn require_bool(record: &RawRemoteRecord, field: &str) -> DecodeResult<bool> {
    require(record, field, "bool", FieldValue::as_bool)
}

pub fn require_timestamp(record: &RawRemoteRecord, field: &str) -> DecodeResult<DateTime<Utc>> {
    require(record, field, "timestamp", FieldValue::as_timestamp)
}
