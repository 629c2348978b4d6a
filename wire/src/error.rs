use thiserror::Error;

/// Failures raised by generated `marshal`/`unmarshal` code and by the byte
/// buffers it is built on.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("marshal failed, {0} must have value")]
    MissingField(String),

    #[error("unmarshal failed, field {0} not found")]
    FieldNotFound(String),

    #[error("unexpected end of buffer at offset {offset}, needed {needed} more byte(s)")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
    },

    #[error("invalid length prefix {0}")]
    InvalidLength(i64),

    #[error("invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid value {value} for enum {name}")]
    InvalidEnumValue {
        name:  String,
        value: u32,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
