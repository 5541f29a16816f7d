//! Error type for package descriptor loading and manifest diffing.

/// Errors produced while loading or diffing package manifests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A lower-level filesystem/JSON/checksum operation failed.
    #[error(transparent)]
    Tools(#[from] orchestration_tools::Error),

    /// A package's `name` contains a character outside `[A-Za-z0-9._-]`.
    #[error("invalid package name {0:?}: must match [A-Za-z0-9._-]")]
    InvalidName(String),

    /// A `package-type` string did not match `service` or `shared_object`.
    #[error("unrecognized package type: {0}")]
    UnknownPackageType(String),

    /// `buildInstallationQueue` found a cycle among `require` edges.
    #[error("circular dependency detected among packages: {0:?}")]
    CyclicDependency(Vec<String>),
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
