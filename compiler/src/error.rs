use thiserror::Error;

#[derive(Debug, Error)]
pub enum DgenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("The type {name} used by {used_by} is not declared as a message or enum")]
    UnresolvedType {
        name:    String,
        used_by: String,
    },

    #[error("The type {0} is defined twice")]
    DuplicateDefinition(String),

    #[error("Field {field} uses {key} as a map key; only integer and string keys are supported")]
    UnsupportedMapKey {
        field: String,
        key:   String,
    },

    #[error("Field {field} uses enum {name}, which has no variants")]
    EmptyEnum {
        field: String,
        name:  String,
    },

    #[error("Unknown backend \"{0}\"")]
    UnknownBackend(String),

    #[error("Unknown encoding \"{0}\", expected \"binary\" or \"json\"")]
    UnknownEncoding(String),

    #[error("Unknown message \"{0}\"")]
    UnknownMessage(String),

    #[error("Wire format error: {0}")]
    Wire(#[from] dgen_wire::WireError),

    #[error("Encode error: {0}")]
    EncodeError(String),
}
