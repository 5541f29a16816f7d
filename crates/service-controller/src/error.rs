//! Error type for the service registry, liveness probe, and reload RPC.

/// Errors produced while registering, probing, or reconfiguring a
/// nano-service.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying filesystem/JSON operation failed.
    #[error(transparent)]
    Tools(#[from] orchestration_tools::Error),

    /// The watchdog-query shell command used by the liveness probe failed
    /// to run at all (as opposed to timing out, which is retried).
    #[error("liveness probe for {service} failed to run: {source}")]
    ProbeExecutor {
        /// The service being probed.
        service: String,
        /// Underlying executor error.
        #[source]
        source: command_executor::Error,
    },

    /// The hot-reload POST could not reach the service's listening port.
    #[error("reload request to {service} (port {port}) failed: {source}")]
    Transport {
        /// The service that could not be reached.
        service: String,
        /// The port the reload POST targeted.
        port: u16,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The reload response body could not be parsed.
    #[error("malformed reload response from {service}: {source}")]
    MalformedResponse {
        /// The service whose response could not be parsed.
        service: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// A batched reconfiguration did not reach a terminal state for every
    /// service within the configured timeout.
    #[error("reconfiguration batch timed out after {0:?}")]
    BatchTimeout(std::time::Duration),

    /// A batched reconfiguration was short-circuited by a FAILED service.
    #[error("service {service} failed to reconfigure: {message}")]
    ReconfigurationFailed {
        /// The service that failed.
        service: String,
        /// The error message reported by the service, if any.
        message: String,
    },

    /// The requested (tenant, profile) pair is not known to the tenant
    /// manager.
    #[error("unknown tenant/profile pair {0}")]
    UnknownTenantProfile(orchestration_tools::TenantProfilePair),
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
