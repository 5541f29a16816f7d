//! Error type for artifact downloads.

/// Errors produced while fetching and verifying an artifact.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying filesystem/checksum operation failed.
    #[error(transparent)]
    Tools(#[from] orchestration_tools::Error),

    /// The HTTP request itself failed (unreachable host, timeout, non-2xx).
    #[error("transport error fetching {resource}: {source}")]
    Transport {
        /// The resource that was being fetched (URL or fog path).
        resource: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The downloaded artifact's checksum did not match the declared value.
    /// Never retried — treated as adversarial per spec §7.
    #[error("checksum mismatch for {resource}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The resource that was fetched.
        resource: String,
        /// The checksum the caller declared.
        expected: String,
        /// The checksum actually computed over the downloaded bytes.
        actual: String,
    },
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
