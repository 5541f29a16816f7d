//! Error type for the manifest controller.

/// Errors produced while applying a manifest update.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying filesystem/JSON operation failed.
    #[error(transparent)]
    Tools(#[from] orchestration_tools::Error),

    /// Manifest loading, diffing, or queue construction failed.
    #[error(transparent)]
    Manifest(#[from] manifest::Error),

    /// Fetching a new package's artifact failed. Aborts the tick per spec
    /// step 6 — never retried within the same tick.
    #[error("failed to download package {package}: {source}")]
    Download {
        /// The package whose artifact could not be fetched.
        package: String,
        /// Underlying backend error.
        #[source]
        source: update_communication::Error,
    },
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
