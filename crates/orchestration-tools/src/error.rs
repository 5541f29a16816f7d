//! Error type for the orchestration tools capability surface.

/// Errors produced by filesystem, checksum, and JSON helpers.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying filesystem operation failed.
    #[error("filesystem error on {path}: {source}")]
    Io {
        /// Path the operation was attempted against.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("json error on {path}: {source}")]
    Json {
        /// Path the document was read from or written to.
        path: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A `checksum-type` string did not match any known algorithm.
    #[error("unrecognized checksum type: {0}")]
    UnknownChecksumType(String),

    /// A package `name` contained a character outside `[A-Za-z0-9._-]`.
    #[error("invalid package name: {0}")]
    InvalidPackageName(String),

    /// A top-level JSON value passed to `json_object_splitter` was not an object.
    #[error("expected a JSON object to split, got: {0}")]
    NotAnObject(String),

    /// Base64 payload could not be decoded.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
