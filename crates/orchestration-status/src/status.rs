//! The observable status record: one snapshot of "what is the agent doing
//! and what did it last see", read/write-lock protected like the teacher's
//! `StateManager`, adapted from "deployment state" to "agent status".

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::debug;

/// Coarse update status, mirroring the strings the fog-facing report uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStatus {
    /// Nothing has run yet.
    Unset,
    /// The most recent tick applied cleanly.
    Success,
    /// The most recent tick reported a combined failure.
    Failed,
    /// Registration has not yet succeeded.
    RegistrationInProgress,
}

impl Default for UpdateStatus {
    fn default() -> Self {
        UpdateStatus::Unset
    }
}

/// Per-service policy/settings checksum, used to detect when a given
/// service's view of its own configuration has changed since it was last
/// reported.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigChecksums {
    /// Checksum of the policy content last written for this service.
    pub policy_checksum: Option<String>,
    /// Checksum of the settings content last written for this service.
    pub settings_checksum: Option<String>,
}

/// The full status snapshot, persisted as `orchestration_status.json`
/// (spec §4.K).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestrationStatusRecord {
    /// When the last update attempt (POLL) started, if any.
    pub last_update_attempt: Option<DateTime<Utc>>,
    /// When the last update attempt completed, if any.
    pub last_update_time: Option<DateTime<Utc>>,
    /// Coarse status string for the most recent tick.
    pub update_status: UpdateStatus,
    /// The currently applied policy version, if any.
    pub policy_version: Option<String>,
    /// When the policy file was last rewritten.
    pub last_policy_update: Option<DateTime<Utc>>,
    /// When the manifest file was last rewritten.
    pub last_manifest_update: Option<DateTime<Utc>>,
    /// When the settings file was last rewritten.
    pub last_settings_update: Option<DateTime<Utc>>,
    /// Whether the agent has completed registration.
    pub registration_status: UpdateStatus,
    /// The fog host currently in use, if known.
    pub fog_address: Option<String>,
    /// The agent id returned at registration.
    pub agent_id: Option<String>,
    /// The profile id returned at registration.
    pub profile_id: Option<String>,
    /// The tenant id returned at registration.
    pub tenant_id: Option<String>,
    /// Free-form registration details (e.g. the registered-with-fog
    /// timestamp, the registration mode).
    pub registration_details: HashMap<String, String>,
    /// Per-service policy/settings checksums, keyed by service name.
    pub service_configs: HashMap<String, ServiceConfigChecksums>,
}

/// Read/write-lock-protected handle to one [`OrchestrationStatusRecord`],
/// persisted to `status_file`. All mutation goes through a setter so the
/// in-memory record and the on-disk copy never silently diverge for more
/// than one REPORT tick.
pub struct OrchestrationStatus {
    record: RwLock<OrchestrationStatusRecord>,
    status_file: PathBuf,
}

impl OrchestrationStatus {
    /// Build a status handle backed by `status_file`, loading whatever was
    /// last persisted there (or a fresh default record if none exists).
    pub fn new(status_file: impl Into<PathBuf>) -> Self {
        let status_file = status_file.into();
        let record = orchestration_tools::json_to_object(&status_file).unwrap_or_default();
        Self {
            record: RwLock::new(record),
            status_file,
        }
    }

    /// Snapshot the current record.
    pub fn snapshot(&self) -> OrchestrationStatusRecord {
        self.record.read().expect("status lock poisoned").clone()
    }

    /// Persist the current record to `status_file` via the atomic-replace
    /// invariant, called from component teardown and opportunistically
    /// from REPORT.
    pub fn write_status_to_file(&self) -> Result<()> {
        let record = self.snapshot();
        orchestration_tools::object_to_json(&record, &self.status_file)?;
        debug!(path = %self.status_file.display(), "wrote orchestration status");
        Ok(())
    }

    /// Record the start of a POLL attempt.
    pub fn set_update_attempt(&self, at: DateTime<Utc>) {
        self.record.write().expect("status lock poisoned").last_update_attempt = Some(at);
    }

    /// Record the outcome of a completed tick.
    pub fn set_update_result(&self, at: DateTime<Utc>, status: UpdateStatus) {
        let mut record = self.record.write().expect("status lock poisoned");
        record.last_update_time = Some(at);
        record.update_status = status;
    }

    /// Record that the policy file was rewritten, with its new version.
    pub fn set_policy_updated(&self, at: DateTime<Utc>, version: impl Into<String>) {
        let mut record = self.record.write().expect("status lock poisoned");
        record.last_policy_update = Some(at);
        record.policy_version = Some(version.into());
    }

    /// Record that the manifest file was rewritten.
    pub fn set_manifest_updated(&self, at: DateTime<Utc>) {
        self.record.write().expect("status lock poisoned").last_manifest_update = Some(at);
    }

    /// Record that the settings file was rewritten.
    pub fn set_settings_updated(&self, at: DateTime<Utc>) {
        self.record.write().expect("status lock poisoned").last_settings_update = Some(at);
    }

    /// Record a successful registration's identity and fog address.
    pub fn set_registration(
        &self,
        agent_id: impl Into<String>,
        profile_id: impl Into<String>,
        tenant_id: impl Into<String>,
        fog_address: impl Into<String>,
    ) {
        let mut record = self.record.write().expect("status lock poisoned");
        record.agent_id = Some(agent_id.into());
        record.profile_id = Some(profile_id.into());
        record.tenant_id = Some(tenant_id.into());
        record.fog_address = Some(fog_address.into());
        record.registration_status = UpdateStatus::Success;
    }

    /// Attach a free-form registration detail, e.g. `"registered_at"`.
    pub fn set_registration_detail(&self, key: impl Into<String>, value: impl Into<String>) {
        self.record
            .write()
            .expect("status lock poisoned")
            .registration_details
            .insert(key.into(), value.into());
    }

    /// Record a service's policy/settings checksums as last written.
    pub fn set_service_config(&self, service_name: impl Into<String>, checksums: ServiceConfigChecksums) {
        self.record
            .write()
            .expect("status lock poisoned")
            .service_configs
            .insert(service_name.into(), checksums);
    }
}

/// Flattened `label: value` view of the record, matching the `show
/// orchestration-status` REST endpoint's output shape (spec §6).
pub fn flatten_for_display(record: &OrchestrationStatusRecord) -> Vec<(String, String)> {
    fn fmt_time(t: &Option<DateTime<Utc>>) -> String {
        t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())
    }
    fn fmt_opt(v: &Option<String>) -> String {
        v.clone().unwrap_or_else(|| "unknown".to_string())
    }

    let mut lines = vec![
        ("Last update attempt".to_string(), fmt_time(&record.last_update_attempt)),
        ("Last update time".to_string(), fmt_time(&record.last_update_time)),
        ("Update status".to_string(), format!("{:?}", record.update_status)),
        ("Policy version".to_string(), fmt_opt(&record.policy_version)),
        ("Last policy update".to_string(), fmt_time(&record.last_policy_update)),
        ("Last manifest update".to_string(), fmt_time(&record.last_manifest_update)),
        ("Last settings update".to_string(), fmt_time(&record.last_settings_update)),
        ("Registration status".to_string(), format!("{:?}", record.registration_status)),
        ("Fog address".to_string(), fmt_opt(&record.fog_address)),
        ("Agent id".to_string(), fmt_opt(&record.agent_id)),
        ("Profile id".to_string(), fmt_opt(&record.profile_id)),
        ("Tenant id".to_string(), fmt_opt(&record.tenant_id)),
    ];

    for (key, value) in &record.registration_details {
        lines.push((key.clone(), value.clone()));
    }
    for (service, checksums) in &record.service_configs {
        lines.push((
            format!("{service} policy checksum"),
            checksums.policy_checksum.clone().unwrap_or_else(|| "none".to_string()),
        ));
        lines.push((
            format!("{service} settings checksum"),
            checksums.settings_checksum.clone().unwrap_or_else(|| "none".to_string()),
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fresh_status_has_unset_update_status() {
        let dir = tempdir().unwrap();
        let status = OrchestrationStatus::new(dir.path().join("orchestration_status.json"));
        assert_eq!(status.snapshot().update_status, UpdateStatus::Unset);
    }

    #[test]
    fn write_then_reload_round_trips() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("orchestration_status.json");

        let status = OrchestrationStatus::new(&file);
        status.set_registration("agent-1", "profile-1", "tenant-1", "fog.example.com:443");
        status.set_policy_updated(Utc::now(), "v2");
        status.write_status_to_file().unwrap();

        let reloaded = OrchestrationStatus::new(&file);
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.agent_id.as_deref(), Some("agent-1"));
        assert_eq!(snapshot.policy_version.as_deref(), Some("v2"));
    }

    #[test]
    fn flatten_includes_service_checksums() {
        let dir = tempdir().unwrap();
        let status = OrchestrationStatus::new(dir.path().join("orchestration_status.json"));
        status.set_service_config(
            "svcX",
            ServiceConfigChecksums {
                policy_checksum: Some("abc123".to_string()),
                settings_checksum: None,
            },
        );

        let lines = flatten_for_display(&status.snapshot());
        assert!(lines.iter().any(|(k, v)| k == "svcX policy checksum" && v == "abc123"));
        assert!(lines.iter().any(|(k, v)| k == "svcX settings checksum" && v == "none"));
    }

    #[test]
    fn update_result_sets_time_and_status() {
        let dir = tempdir().unwrap();
        let status = OrchestrationStatus::new(dir.path().join("orchestration_status.json"));
        let now = Utc::now();
        status.set_update_result(now, UpdateStatus::Success);
        let snapshot = status.snapshot();
        assert_eq!(snapshot.update_status, UpdateStatus::Success);
        assert_eq!(snapshot.last_update_time, Some(now));
    }
}
