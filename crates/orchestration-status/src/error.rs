//! Error type for the orchestration status record.

/// Errors produced while reading or persisting the status record.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying filesystem/JSON operation failed.
    #[error(transparent)]
    Tools(#[from] orchestration_tools::Error),
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
