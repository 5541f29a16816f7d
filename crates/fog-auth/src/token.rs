//! The bearer token handed out by the fog, plus the one-time registration
//! token used to bootstrap credentials.

use std::time::{Duration, Instant};

/// A bearer token acquired from `/oauth/token`, together with enough state
/// to compute its remaining lifetime without re-contacting the fog.
#[derive(Debug, Clone)]
pub struct AccessToken {
    token_string: String,
    expires_in: Duration,
    received_at: Instant,
}

impl AccessToken {
    /// Wrap a freshly received token, stamping it with the current monotonic
    /// time as its `received_at`.
    pub fn new(token_string: impl Into<String>, expires_in_seconds: u64) -> Self {
        Self {
            token_string: token_string.into(),
            expires_in: Duration::from_secs(expires_in_seconds),
            received_at: Instant::now(),
        }
    }

    /// The raw bearer token string.
    pub fn as_str(&self) -> &str {
        &self.token_string
    }

    /// `expires_in - (now - received_at)`, clamped to zero once expired.
    pub fn remaining_time(&self) -> Duration {
        self.expires_in
            .checked_sub(self.received_at.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Whether this token's remaining time has reached zero.
    pub fn is_expired(&self) -> bool {
        self.remaining_time().is_zero()
    }
}

/// The one-time token used to bootstrap a registration, sourced from a file
/// on disk or from the `AGENT_TOKEN`/`NANO_AGENT_TOKEN` environment
/// variables (checked in that order).
#[derive(Debug, Clone)]
pub struct RegistrationToken(String);

impl RegistrationToken {
    /// Read the registration token: first from `token_file` if it exists
    /// and is non-empty, otherwise from `AGENT_TOKEN`, otherwise from
    /// `NANO_AGENT_TOKEN`.
    pub fn resolve(token_file: Option<&std::path::Path>) -> crate::Result<Self> {
        if let Some(path) = token_file {
            if orchestration_tools::non_empty_file(path) {
                let text = orchestration_tools::read_file(path)?;
                return Ok(Self(text.trim().to_string()));
            }
        }
        if let Ok(value) = std::env::var("AGENT_TOKEN") {
            if !value.is_empty() {
                return Ok(Self(value));
            }
        }
        if let Ok(value) = std::env::var("NANO_AGENT_TOKEN") {
            if !value.is_empty() {
                return Ok(Self(value));
            }
        }
        Err(crate::Error::NoRegistrationToken)
    }

    /// The raw token string, sent as part of the registration body.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_has_full_remaining_time() {
        let token = AccessToken::new("abc", 3600);
        assert!(token.remaining_time() <= Duration::from_secs(3600));
        assert!(token.remaining_time() > Duration::from_secs(3599));
        assert!(!token.is_expired());
    }

    #[test]
    fn zero_ttl_token_is_immediately_expired() {
        let token = AccessToken::new("abc", 0);
        assert!(token.is_expired());
    }

    #[test]
    fn resolves_from_env_when_no_file_given() {
        std::env::set_var("NANO_AGENT_TOKEN", "from-env-token");
        std::env::remove_var("AGENT_TOKEN");
        let token = RegistrationToken::resolve(None).unwrap();
        assert_eq!(token.as_str(), "from-env-token");
        std::env::remove_var("NANO_AGENT_TOKEN");
    }

    #[test]
    fn missing_everywhere_is_an_error() {
        std::env::remove_var("AGENT_TOKEN");
        std::env::remove_var("NANO_AGENT_TOKEN");
        assert!(matches!(
            RegistrationToken::resolve(None),
            Err(crate::Error::NoRegistrationToken)
        ));
    }
}
