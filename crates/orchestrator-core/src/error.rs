//! The top-level error aggregating every stage of one tick into the
//! combined outcome REPORT consumes (spec §7).

use thiserror::Error;

/// Aggregated error type for the main loop and its configuration layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The on-disk agent configuration could not be read.
    #[error("failed to read agent configuration: {0}")]
    ConfigRead(#[from] orchestration_tools::Error),

    /// The on-disk agent configuration was syntactically valid JSON but
    /// failed a semantic check (e.g. a missing fog address).
    #[error("invalid agent configuration: {0}")]
    ConfigInvalid(String),

    /// Registration or token acquisition failed; START retries with a
    /// fixed short sleep.
    #[error(transparent)]
    Auth(#[from] fog_auth::Error),

    /// The POLL stage's `checkUpdate` call failed outright (as opposed to
    /// succeeding with no changes).
    #[error(transparent)]
    UpdateCheck(#[from] update_communication::Error),

    /// The manifest stage of APPLY failed.
    #[error(transparent)]
    Manifest(#[from] manifest_controller::Error),

    /// The service-controller stage of APPLY (policy/settings/data
    /// rollout) failed.
    #[error(transparent)]
    ServiceController(#[from] service_controller::Error),

    /// Persisting the observable status record failed.
    #[error(transparent)]
    Status(#[from] orchestration_status::Error),

    /// One APPLY tick accumulated failures from more than one stage;
    /// REPORT receives the combined message rather than a single
    /// `#[source]`, matching spec §4.J's "each stage is independent,
    /// failures accumulate" rule.
    #[error("apply stage failures: {0}")]
    CombinedApplyFailure(String),
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
