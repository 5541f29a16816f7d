//! Error type for the update-communication backends.

/// Errors produced while checking for and fetching updates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying filesystem/JSON operation failed.
    #[error(transparent)]
    Tools(#[from] orchestration_tools::Error),

    /// Token acquisition or registration failed (Fog/Hybrid backends only).
    #[error(transparent)]
    Auth(#[from] fog_auth::Error),

    /// Artifact fetch or checksum verification failed.
    #[error(transparent)]
    Download(#[from] downloader::Error),

    /// The `CheckUpdateRequest` itself could not be sent or the fog
    /// returned a non-2xx status.
    #[error("check-update request failed: {0}")]
    CheckUpdateFailed(String),

    /// The Local backend's staging directory is missing an artifact the
    /// manifest references.
    #[error("staged artifact not found: {0}")]
    MissingStagedArtifact(String),

    /// The declarative-policy watcher could not start watching its source
    /// file.
    #[error("declarative policy watch failed: {0}")]
    Watch(#[from] notify::Error),
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
