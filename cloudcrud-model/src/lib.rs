//! Entity codec contract for cloudcrud.
//!
//! Application entity types implement [`RecordCodec`] to become storable in
//! the remote database. The CRUD client and the collection store are generic
//! over this trait; nothing else is required of an entity.

mod codec;
mod error;

pub use codec::{
    ensure_record_type, require_bool, require_f64, require_i64, require_str, require_timestamp,
    RecordCodec,
};
pub use error::{DecodeError, DecodeResult};
