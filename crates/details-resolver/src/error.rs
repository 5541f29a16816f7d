//! Error type for host/platform fact resolution.

/// Errors produced while resolving host facts.
///
/// Every probe degrades to "unknown" rather than propagating one of these —
/// this type exists for the handful of operations (reading the agent's own
/// version file) where a failure genuinely should surface.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying filesystem operation failed.
    #[error(transparent)]
    Tools(#[from] orchestration_tools::Error),
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
