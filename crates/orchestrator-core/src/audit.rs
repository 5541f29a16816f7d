//! The two user-facing audit event templates REPORT emits (spec §4.J):
//! a policy-update notice, and a manifest-failure notice distinguishing
//! "critical: was never fully deployed" from "warning: running previous
//! software". Also the `POST /agents/events` fire-and-forget sender
//! (spec §6), with a small on-disk backlog so a fog outage doesn't drop
//! events outright.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// One audit event, shaped for the in-process event bus / `POST
/// /agents/events` fire-and-forget surface (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Human-readable title.
    pub title: String,
    /// Free-form body text.
    pub message: String,
    /// Severity, one of `info`, `warning`, `critical`.
    pub severity: &'static str,
}

/// "Agent's policy has been updated" — emitted once per successful policy
/// rollout, carrying the version transition.
pub fn policy_updated(from_version: &str, policy_version: &str) -> AuditEvent {
    AuditEvent {
        title: "Agent's policy has been updated".to_string(),
        message: format!("Policy updated from version {from_version} to {policy_version}"),
        severity: "info",
    }
}

/// A manifest-stage failure. `ever_deployed` distinguishes a package that
/// has never successfully installed (critical: the service never came up)
/// from one that previously installed and is merely stuck on the old
/// version (warning: degraded but functional).
pub fn manifest_failure(package: &str, ever_deployed: bool) -> AuditEvent {
    if ever_deployed {
        AuditEvent {
            title: format!("Failed to update package {package}"),
            message: format!("{package} could not be updated; running previous software"),
            severity: "warning",
        }
    } else {
        AuditEvent {
            title: format!("Failed to install package {package}"),
            message: format!("{package} was never fully deployed"),
            severity: "critical",
        }
    }
}

/// POST `events` to `{fog}/agents/events`, persisting them to
/// `backlog_file` on failure so the next call (rather than this one)
/// retries the whole backlog — the same best-effort shape as the
/// `sendPolicyVersion` call: a failure here is logged, not propagated,
/// since it cannot block the tick that already applied the change locally.
pub async fn send_audit_events(
    client: &reqwest::Client,
    fog_address: &str,
    access_token: &str,
    events: &[AuditEvent],
    backlog_file: &Path,
) {
    let mut batch: Vec<AuditEvent> = if orchestration_tools::non_empty_file(backlog_file) {
        orchestration_tools::json_to_object(backlog_file).unwrap_or_default()
    } else {
        Vec::new()
    };
    batch.extend(events.iter().cloned());

    if batch.is_empty() {
        return;
    }

    let url = format!("{}/agents/events", fog_address.trim_end_matches('/'));
    match client.post(&url).bearer_auth(access_token).json(&batch).send().await {
        Ok(response) if response.status().is_success() => {
            info!(count = batch.len(), "reported audit events to fog");
            let _ = orchestration_tools::remove_file(backlog_file);
        }
        Ok(response) => {
            warn!(status = %response.status(), count = batch.len(), "fog rejected audit events, keeping backlog");
            let _ = orchestration_tools::object_to_json(&batch, backlog_file);
        }
        Err(e) => {
            warn!(error = %e, count = batch.len(), "failed to report audit events, keeping backlog");
            let _ = orchestration_tools::object_to_json(&batch, backlog_file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_updated_carries_both_versions() {
        let event = policy_updated("v1", "v2");
        assert!(event.message.contains("v1"));
        assert!(event.message.contains("v2"));
        assert_eq!(event.severity, "info");
    }

    #[test]
    fn manifest_failure_distinguishes_critical_from_warning() {
        assert_eq!(manifest_failure("svcX", false).severity, "critical");
        assert_eq!(manifest_failure("svcX", true).severity, "warning");
    }
}
