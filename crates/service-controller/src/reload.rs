//! The hot-reload RPC: `POST 127.0.0.1:<port>/set-new-configuration` and the
//! five response transitions (spec §4.I).

use crate::liveness::{is_service_active, WatchdogQuery};
use crate::reconfig::ReconfStatus;
use crate::registry::ServiceDetails;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize)]
struct ReloadRequest<'a> {
    id: u64,
    policy_version: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReloadResponse {
    finished: bool,
    #[serde(default)]
    error: bool,
    #[serde(default)]
    error_message: Option<String>,
}

/// Issues the hot-reload POST against a single service's listening port.
pub struct ReloadClient {
    client: reqwest::Client,
}

impl Default for ReloadClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadClient {
    /// Build a client sharing one underlying `reqwest::Client`.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Dispatch a reload to `service`, first checking liveness via
    /// `watchdog`. Returns the immediate status and, for `IN_PROGRESS`, the
    /// caller is expected to wait for a later `/set-reconf-status` callback
    /// to report the terminal outcome.
    ///
    /// The four legal transitions from spec §4.I, plus the liveness-probe
    /// gate that yields the fifth (`INACTIVE`):
    ///
    /// | response | effect |
    /// |---|---|
    /// | not active | `INACTIVE`, removed from registry by the caller |
    /// | transport failure | `FAILED` |
    /// | `finished=true, error=false` | `SUCCEEDED` |
    /// | `finished=true, error=true` | `FAILED`, audit log |
    /// | `finished=false` | `IN_PROGRESS` |
    pub async fn dispatch(
        &self,
        watchdog: &dyn WatchdogQuery,
        service: &ServiceDetails,
        configuration_id: u64,
        policy_version: &str,
    ) -> (ReconfStatus, Option<String>) {
        if !is_service_active(watchdog, service).await {
            return (ReconfStatus::Inactive, None);
        }

        let url = format!("http://127.0.0.1:{}/set-new-configuration", service.listening_port);
        let body = ReloadRequest {
            id: configuration_id,
            policy_version,
        };

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(service = %service.service_name, error = %e, "reload transport failure");
                return (ReconfStatus::Failed, Some(e.to_string()));
            }
        };

        if !response.status().is_success() {
            return (ReconfStatus::Failed, Some(format!("http status {}", response.status())));
        }

        let parsed: ReloadResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => return (ReconfStatus::Failed, Some(format!("malformed response: {e}"))),
        };

        match (parsed.finished, parsed.error) {
            (true, false) => (ReconfStatus::Succeeded, None),
            (true, true) => (
                ReconfStatus::Failed,
                Some(parsed.error_message.unwrap_or_else(|| "service reported an error".to_string())),
            ),
            (false, _) => (ReconfStatus::InProgress, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_response_parses_in_progress() {
        let parsed: ReloadResponse = serde_json::from_str(r#"{"finished":false}"#).unwrap();
        assert!(!parsed.finished);
        assert!(!parsed.error);
    }

    #[test]
    fn reload_response_parses_terminal_error() {
        let parsed: ReloadResponse =
            serde_json::from_str(r#"{"finished":true,"error":true,"error_message":"bad policy"}"#).unwrap();
        assert!(parsed.finished);
        assert!(parsed.error);
        assert_eq!(parsed.error_message.as_deref(), Some("bad policy"));
    }
}
