use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::Variant;

/// Result type for bridge operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for bridge operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("decoding failed: {0}")]
    Decoding(#[from] DecodingError),

    #[error("unsupported variant tag: {0:?}")]
    UnsupportedVariant(String),

    #[error("{variant} cannot be sent in this direction")]
    Misdirected { variant: Variant },

    #[error("host launch failed: {0}")]
    LaunchFailure(#[from] LaunchError),

    #[error("pending store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// A field constraint was violated while building or decoding a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is {actual} bytes, limit is {limit}")]
    TooLong {
        field: &'static str,
        limit: usize,
        actual: usize,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} has {actual} items, limit is {limit}")]
    TooMany {
        field: &'static str,
        limit: usize,
        actual: usize,
    },

    #[error("exactly one of {first} or {second} must be set")]
    NotExactlyOne {
        first: &'static str,
        second: &'static str,
    },

    #[error("at least one of {fields} must be set")]
    AllEmpty { fields: &'static str },

    #[error("{field} was set more than once")]
    Duplicate { field: &'static str },

    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} is only allowed {condition}")]
    NotAllowed {
        field: &'static str,
        condition: &'static str,
    },

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("{field} has unknown value {value}")]
    UnknownCode { field: &'static str, value: i64 },
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            Self::TooLong { field, .. }
            | Self::Empty { field }
            | Self::TooMany { field, .. }
            | Self::Duplicate { field }
            | Self::Missing { field }
            | Self::NotAllowed { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::UnknownCode { field, .. } => field,
            Self::NotExactlyOne { first, .. } => first,
            Self::AllEmpty { fields } => fields,
        }
    }
}

/// Errors produced while encoding a message into a transport payload
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("message no longer valid: {0}")]
    Invalid(#[from] ValidationError),

    #[error("binary field {field} is {actual} bytes, transport limit is {limit}")]
    FieldTooLarge {
        field: &'static str,
        limit: usize,
        actual: usize,
    },

    #[error("payload is {actual} bytes, transport limit is {limit}")]
    PayloadTooLarge { limit: usize, actual: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
}

/// Errors produced while decoding a transport payload
#[derive(Error, Debug)]
pub enum DecodingError {
    #[error("truncated payload: {0}")]
    Truncated(&'static str),

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid message kind byte {0}")]
    InvalidKind(u8),

    #[error("invalid variant tag: {0}")]
    InvalidTag(String),

    #[error("{variant} has no {kind} form")]
    KindMismatch {
        variant: Variant,
        kind: &'static str,
    },

    #[error("payload is {actual} bytes, transport limit is {limit}")]
    PayloadTooLarge { limit: usize, actual: usize },

    #[error("attachment {reference} for {field} could not be resolved")]
    MissingAttachment {
        field: &'static str,
        reference: String,
    },

    #[error("attachment for {field} declared {declared} bytes, got {actual}")]
    AttachmentLength {
        field: &'static str,
        declared: usize,
        actual: usize,
    },

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("decoded message is invalid: {0}")]
    Invalid(#[from] ValidationError),
}

/// Failure reported by the launch collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("host app is not installed")]
    HostNotInstalled,

    #[error("host app does not support this request")]
    Unsupported,

    #[error("launch rejected: {0}")]
    Rejected(String),
}

/// Errors from the durable pending-record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt pending store {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize pending records: {0}")]
    Serialize(#[from] serde_json::Error),
}
