use thiserror::Error;

/// Result type for decoding a remote record into an entity.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Why a remote record could not become an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("field `{field}` has type {found}, expected {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("record type `{found}` does not match `{expected}`")]
    RecordTypeMismatch { expected: String, found: String },
}
