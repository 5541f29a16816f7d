//! `updateFogAddress` and `sendPolicyVersion` (spec §4.J): a policy update
//! may change the fog address; only a real change triggers a reconnect,
//! after which the new policy version is pushed back to the fog.

use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Whether `new` differs from `current` in host, port, or TLS usage.
/// `(host, ssl)` pairs mirror the teacher's habit of comparing connection
/// identity as a tuple rather than a raw string, so `fog.example.com:443`
/// over TLS is distinguished from the same string without TLS.
pub fn fog_address_changed(current: (&str, bool), new: (&str, bool)) -> bool {
    current != new
}

#[derive(Debug, Serialize)]
struct PolicyVersionReport<'a> {
    #[serde(rename = "policyVersion")]
    policy_version: &'a str,
    versions: &'a HashMap<String, String>,
}

/// PATCH-style push of the new policy version to the fog (spec §6), best
/// effort: a failure here is logged, not propagated, since it cannot block
/// the tick that already applied the policy locally.
pub async fn send_policy_version(
    client: &reqwest::Client,
    fog_address: &str,
    access_token: &str,
    policy_version: &str,
    versions: &HashMap<String, String>,
) {
    let url = format!("{}/agents/policy-version", fog_address.trim_end_matches('/'));
    let body = PolicyVersionReport {
        policy_version,
        versions,
    };

    match client.patch(&url).bearer_auth(access_token).json(&body).send().await {
        Ok(response) if response.status().is_success() => {
            info!(policy_version, "reported policy version to fog");
        }
        Ok(response) => {
            tracing::warn!(status = %response.status(), "fog rejected policy version report");
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to report policy version to fog");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_address_and_tls_is_unchanged() {
        assert!(!fog_address_changed(("fog.example.com:443", true), ("fog.example.com:443", true)));
    }

    #[test]
    fn host_change_is_detected() {
        assert!(fog_address_changed(("a.example.com:443", true), ("b.example.com:443", true)));
    }

    #[test]
    fn tls_only_change_is_detected() {
        assert!(fog_address_changed(("fog.example.com:443", true), ("fog.example.com:443", false)));
    }
}
