//! Agent registration and OAuth2 client-credentials token acquisition
//! against the fog, with pre-expiry refresh scheduling.
//!
//! [`FogAuthenticator::establish`] performs the one-time registration dance
//! (or loads persisted credentials) and acquires the first access token;
//! [`spawn_refresher`] then starts the single long-lived task that keeps the
//! token alive for the rest of the process's life, grounded on
//! `fog_authenticator.h`'s `AccessToken`/`RegistrationData`/`UserCredentials`
//! split.

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod authenticator;
mod credentials;
mod error;
mod token;

pub use authenticator::{
    spawn_refresher, AuthenticatorPaths, FogAuthenticator, RegistrationStatus,
    DEFAULT_MIN_REFRESH_INTERVAL, DEFAULT_PRE_EXPIRE_WINDOW,
};
pub use credentials::{Credentials, RegisteredIdentity, RegistrationResponse};
pub use error::{Error, Result};
pub use token::{AccessToken, RegistrationToken};
