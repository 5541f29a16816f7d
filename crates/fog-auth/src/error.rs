//! Error type for registration and token acquisition.

/// Errors produced by the fog authenticator.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying filesystem/JSON operation failed.
    #[error(transparent)]
    Tools(#[from] orchestration_tools::Error),

    /// No one-time registration token was found on disk or in the
    /// `AGENT_TOKEN`/`NANO_AGENT_TOKEN` environment variables.
    #[error("no registration token available: set AGENT_TOKEN/NANO_AGENT_TOKEN or provide a token file")]
    NoRegistrationToken,

    /// The registration or token request itself failed to reach the fog.
    #[error("transport error during {operation}: {source}")]
    Transport {
        /// `"registration"` or `"token acquisition"`.
        operation: &'static str,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The fog rejected the request (non-2xx response).
    #[error("fog rejected {operation} with status {status}")]
    Rejected {
        /// `"registration"` or `"token acquisition"`.
        operation: &'static str,
        /// The HTTP status code returned.
        status: u16,
    },

    /// A successful response body could not be parsed.
    #[error("malformed {operation} response: {source}")]
    MalformedResponse {
        /// `"registration"` or `"token acquisition"`.
        operation: &'static str,
        /// Underlying JSON error.
        #[source]
        source: reqwest::Error,
    },

    /// No access token has been acquired yet and none can be waited for.
    #[error("no access token has been acquired")]
    NoAccessToken,
}

/// Convenience result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
