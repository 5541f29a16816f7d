//! Error type for the package handler's shell-driven install sequences.

/// Errors produced while running a package's pre-install, install,
/// post-install, or uninstall sequence.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying filesystem/checksum operation failed.
    #[error(transparent)]
    Tools(#[from] orchestration_tools::Error),

    /// The scoped shell invocation failed to launch or exited non-zero.
    #[error("{stage} failed for package {package}: {reason}")]
    StageFailed {
        /// Which stage failed (`pre-install`, `install`, `post-install`,
        /// `uninstall`).
        stage: &'static str,
        /// The package name the stage was run against.
        package: String,
        /// Exit code or launch failure description.
        reason: String,
    },

    /// The command executor could not even launch the script.
    #[error(transparent)]
    Executor(#[from] command_executor::Error),
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
