//! Persisted client credentials and the registration response that produces
//! them.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The `(client_id, shared_secret)` pair issued by a successful
/// registration, persisted to disk so future process starts skip the
/// one-time-token dance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// OAuth2 client id, sent as the Basic-auth username at token time.
    pub client_id: String,
    /// OAuth2 client secret, sent as the Basic-auth password at token time.
    pub shared_secret: String,
}

impl Credentials {
    /// Load persisted credentials from `path`, if present.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Option<Self>> {
        if !orchestration_tools::non_empty_file(&path) {
            return Ok(None);
        }
        Ok(Some(orchestration_tools::json_to_object(path)?))
    }

    /// Persist credentials to `path` via the atomic-replace invariant.
    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        Ok(orchestration_tools::object_to_json(self, path)?)
    }
}

/// The identity facts a successful `/agents` registration returns alongside
/// the credentials, written into agent-details and status by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisteredIdentity {
    /// The agent id assigned by the fog.
    pub agent_id: String,
    /// The profile id this agent was enrolled under.
    pub profile_id: String,
    /// The tenant id this agent belongs to.
    pub tenant_id: String,
}

#[derive(Debug, Deserialize)]
struct RawRegistrationResponse {
    client_id: String,
    shared_secret: String,
    #[serde(rename = "agentId")]
    agent_id: String,
    #[serde(rename = "profileId")]
    profile_id: String,
    #[serde(rename = "tenantId")]
    tenant_id: String,
}

/// The parsed result of a successful `POST /agents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResponse {
    /// Credentials to persist and use for future token acquisitions.
    pub credentials: Credentials,
    /// Identity facts to write into agent-details and status.
    pub identity: RegisteredIdentity,
}

impl RegistrationResponse {
    pub(crate) fn parse(body: &str) -> crate::Result<Self> {
        let raw: RawRegistrationResponse = serde_json::from_str(body).map_err(|source| {
            crate::Error::Tools(orchestration_tools::Error::Json {
                path: "<registration response>".to_string(),
                source,
            })
        })?;
        Ok(Self {
            credentials: Credentials {
                client_id: raw.client_id,
                shared_secret: raw.shared_secret,
            },
            identity: RegisteredIdentity {
                agent_id: raw.agent_id,
                profile_id: raw.profile_id,
                tenant_id: raw.tenant_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_registration_response() {
        let body = r#"{"client_id":"c","shared_secret":"s","agentId":"A","profileId":"P","tenantId":"T"}"#;
        let parsed = RegistrationResponse::parse(body).unwrap();
        assert_eq!(parsed.credentials.client_id, "c");
        assert_eq!(parsed.identity.agent_id, "A");
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let creds = Credentials {
            client_id: "c".to_string(),
            shared_secret: "s".to_string(),
        };
        creds.save(&path).unwrap();
        let loaded = Credentials::load(&path).unwrap().unwrap();
        assert_eq!(loaded, creds);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        assert!(Credentials::load(dir.path().join("absent.json"))
            .unwrap()
            .is_none());
    }
}
