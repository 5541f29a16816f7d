//! Registration, OAuth2 client-credentials token acquisition, and the
//! single long-lived refresh task, grounded on `fog_authenticator.h`'s
//! `AccessToken`/`RegistrationData`/`UserCredentials` split.

use crate::credentials::{Credentials, RegisteredIdentity, RegistrationResponse};
use crate::error::{Error, Result};
use crate::token::{AccessToken, RegistrationToken};
use async_runtime_compat::Spawner;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{error, info, warn};

/// Pre-expiry window subtracted from `expires_in` before scheduling the
/// next refresh (spec default: 120s).
pub const DEFAULT_PRE_EXPIRE_WINDOW: Duration = Duration::from_secs(120);

/// Floor below which the refresh interval never drops, even for
/// short-lived tokens (spec default: 10s).
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Registration outcome, mirrored into the observable status record by the
/// caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// No registration attempt has completed yet.
    Pending,
    /// The most recent registration or refresh succeeded.
    Success,
    /// The most recent registration or refresh failed.
    Failed,
}

struct State {
    credentials: Option<Credentials>,
    access_token: Option<AccessToken>,
    identity: Option<RegisteredIdentity>,
    status: RegistrationStatus,
}

/// Where the authenticator persists credentials and reads the one-time
/// registration token from.
pub struct AuthenticatorPaths {
    /// Path to the persisted `(client_id, shared_secret)` JSON document.
    pub credentials_file: PathBuf,
    /// Path to the one-time registration token file, removed on success.
    pub registration_token_file: Option<PathBuf>,
}

/// Registration + token acquisition + refresh scheduling against a single
/// fog endpoint.
///
/// `pre_expire_window` and `min_refresh_interval` default to the spec's
/// 120s/10s but are overridable for tests.
pub struct FogAuthenticator {
    client: reqwest::Client,
    fog_address: String,
    paths: AuthenticatorPaths,
    pre_expire_window: Duration,
    min_refresh_interval: Duration,
    state: RwLock<State>,
    ready: (async_channel::Sender<()>, async_channel::Receiver<()>),
}

impl FogAuthenticator {
    /// Build an authenticator against `fog_address`.
    pub fn new(fog_address: impl Into<String>, paths: AuthenticatorPaths) -> Self {
        Self {
            client: reqwest::Client::new(),
            fog_address: fog_address.into(),
            paths,
            pre_expire_window: DEFAULT_PRE_EXPIRE_WINDOW,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            state: RwLock::new(State {
                credentials: None,
                access_token: None,
                identity: None,
                status: RegistrationStatus::Pending,
            }),
            ready: async_channel::bounded(1),
        }
    }

    /// Override the pre-expiry window and minimum refresh interval (tests
    /// use short durations to avoid sleeping real minutes).
    pub fn with_refresh_timing(mut self, pre_expire_window: Duration, min_refresh_interval: Duration) -> Self {
        self.pre_expire_window = pre_expire_window;
        self.min_refresh_interval = min_refresh_interval;
        self
    }

    /// The most recently observed registration status.
    pub fn status(&self) -> RegistrationStatus {
        self.state.read().expect("state lock poisoned").status
    }

    /// The identity returned by the most recent successful registration, if
    /// any.
    pub fn identity(&self) -> Option<RegisteredIdentity> {
        self.state.read().expect("state lock poisoned").identity.clone()
    }

    /// The current bearer token, if one has been acquired.
    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .expect("state lock poisoned")
            .access_token
            .as_ref()
            .map(|t| t.as_str().to_string())
    }

    /// Load persisted credentials, or register with a one-time token if
    /// none are on disk, then acquire the first access token.
    ///
    /// This is the bounded wait the main loop performs exactly once, during
    /// startup, before making any update call (spec §4.F's concurrency
    /// contract).
    pub async fn establish(&self, metadata: &serde_json::Value) -> Result<()> {
        let credentials = match Credentials::load(&self.paths.credentials_file)? {
            Some(creds) => creds,
            None => self.register(metadata).await?,
        };
        self.set_credentials(credentials);
        self.acquire_token().await?;
        let _ = self.ready.0.try_send(());
        Ok(())
    }

    async fn register(&self, metadata: &serde_json::Value) -> Result<Credentials> {
        let token = RegistrationToken::resolve(self.paths.registration_token_file.as_deref())?;

        let mut body = metadata.clone();
        if let Some(object) = body.as_object_mut() {
            object.insert(
                "registrationToken".to_string(),
                serde_json::Value::String(token.as_str().to_string()),
            );
        }

        let response = self
            .client
            .post(format!("{}/agents", self.fog_address.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .map_err(|source| Error::Transport {
                operation: "registration",
                source,
            })?;

        if !response.status().is_success() {
            return Err(Error::Rejected {
                operation: "registration",
                status: response.status().as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| Error::Transport {
            operation: "registration",
            source,
        })?;
        let parsed = RegistrationResponse::parse(&text)?;

        parsed.credentials.save(&self.paths.credentials_file)?;
        if let Some(token_file) = &self.paths.registration_token_file {
            orchestration_tools::remove_file(token_file)?;
        }
        self.state.write().expect("state lock poisoned").identity = Some(parsed.identity.clone());
        info!(agent_id = %parsed.identity.agent_id, "registered with fog");

        Ok(parsed.credentials)
    }

    fn set_credentials(&self, credentials: Credentials) {
        self.state.write().expect("state lock poisoned").credentials = Some(credentials);
    }

    /// POST `/oauth/token?grant_type=client_credentials` with HTTP Basic
    /// auth, storing the resulting token.
    pub async fn acquire_token(&self) -> Result<()> {
        let credentials = self
            .state
            .read()
            .expect("state lock poisoned")
            .credentials
            .clone()
            .ok_or(Error::NoAccessToken)?;

        let result = self
            .client
            .post(format!(
                "{}/oauth/token?grant_type=client_credentials",
                self.fog_address.trim_end_matches('/')
            ))
            .basic_auth(&credentials.client_id, Some(&credentials.shared_secret))
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(source) => {
                self.mark_failed();
                return Err(Error::Transport {
                    operation: "token acquisition",
                    source,
                });
            }
        };

        if !response.status().is_success() {
            self.mark_failed();
            return Err(Error::Rejected {
                operation: "token acquisition",
                status: response.status().as_u16(),
            });
        }

        #[derive(serde::Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let parsed: TokenResponse = match response.json().await {
            Ok(t) => t,
            Err(source) => {
                self.mark_failed();
                return Err(Error::MalformedResponse {
                    operation: "token acquisition",
                    source,
                });
            }
        };

        let mut state = self.state.write().expect("state lock poisoned");
        state.access_token = Some(AccessToken::new(parsed.access_token, parsed.expires_in));
        state.status = RegistrationStatus::Success;
        Ok(())
    }

    fn mark_failed(&self) {
        self.state.write().expect("state lock poisoned").status = RegistrationStatus::Failed;
    }

    fn next_refresh_delay(&self) -> Duration {
        let remaining = self
            .state
            .read()
            .expect("state lock poisoned")
            .access_token
            .as_ref()
            .map(AccessToken::remaining_time)
            .unwrap_or(Duration::ZERO);
        remaining
            .checked_sub(self.pre_expire_window)
            .unwrap_or(Duration::ZERO)
            .max(self.min_refresh_interval)
    }

    /// Wait (with no timeout beyond the caller's own patience) for the
    /// first successful token.
    pub async fn wait_until_ready(&self) {
        if self.access_token().is_some() {
            return;
        }
        let _ = self.ready.1.recv().await;
    }
}

/// Spawn the single long-lived refresh task. Must be called exactly once
/// per authenticator lifetime (spec §4.F's concurrency contract);
/// `authenticator` is expected to be wrapped in an `Arc` by the caller.
pub fn spawn_refresher<S: Spawner>(spawner: &S, authenticator: std::sync::Arc<FogAuthenticator>) {
    spawner.spawn(Box::pin(async move {
        loop {
            let delay = authenticator.next_refresh_delay();
            async_io::Timer::after(delay).await;
            match authenticator.acquire_token().await {
                Ok(()) => info!("refreshed fog access token"),
                Err(e) => warn!(error = %e, "token refresh failed, retrying at minimum interval"),
            }
        }
    }));
}
