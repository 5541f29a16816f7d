//! Agent configuration: the on-disk paths the agent is rooted at (env-driven,
//! matching the teacher's read-error/validation-error config split) and the
//! `OrchestrationPolicy` document loaded with a backup-then-synthesize
//! fallback chain (spec §4.J's START stage).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default sleep between successful ticks (spec default, overridable by
/// the policy document).
pub const DEFAULT_SLEEP_INTERVAL: Duration = Duration::from_secs(25);

/// Default sleep after a failed POLL, before the failure-count multiplier
/// is applied.
pub const DEFAULT_ERROR_SLEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Fixed short sleep between failed START attempts (spec default: 20s).
pub const START_RETRY_SLEEP: Duration = Duration::from_secs(20);

/// Paths and environment-sourced settings the agent is rooted at. Every
/// other path (manifest, policy, packages, credentials, status) is derived
/// from `conf_dir`/`download_dir`/`packages_dir` by the caller assembling
/// the [`crate::context::OrchestrationContext`].
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Root of the `conf/` directory (manifest/policy/settings/data and
    /// their `.bk` siblings, the tenant/profile subdirectories).
    pub conf_dir: PathBuf,
    /// Root of the downloaded-artifact cache.
    pub download_dir: PathBuf,
    /// Root of the installed-package tree.
    pub packages_dir: PathBuf,
    /// Path to the one-time registration token file, if the agent has not
    /// yet registered (overridden by the `NANO_AGENT_TOKEN` env var).
    pub registration_token_file: Option<PathBuf>,
    /// The agent binary's own version, reported at registration.
    pub agent_version: String,
}

impl AgentConfig {
    /// Build configuration from environment variables, defaulting every
    /// path to a location under `root` when its env var is unset.
    pub fn from_env(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let env_path = |var: &str, default: PathBuf| {
            std::env::var(var).map(PathBuf::from).unwrap_or(default)
        };

        Self {
            conf_dir: env_path("ORCHESTRATION_CONF_DIR", root.join("conf")),
            download_dir: env_path("ORCHESTRATION_DOWNLOAD_DIR", root.join("downloads")),
            packages_dir: env_path("ORCHESTRATION_PACKAGES_DIR", root.join("packages")),
            registration_token_file: std::env::var("NANO_AGENT_TOKEN_FILE")
                .map(PathBuf::from)
                .ok()
                .or_else(|| Some(root.join("registration_token.txt"))),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// The one-time registration token's value, preferring the
    /// `AGENT_TOKEN`/`NANO_AGENT_TOKEN` environment variables over the
    /// on-disk file (spec §4.F's registration path).
    pub fn registration_token(&self) -> Option<String> {
        std::env::var("NANO_AGENT_TOKEN")
            .or_else(|_| std::env::var("AGENT_TOKEN"))
            .ok()
            .or_else(|| {
                self.registration_token_file
                    .as_ref()
                    .and_then(|path| orchestration_tools::read_file(path).ok())
                    .map(|s| s.trim().to_string())
            })
    }
}

/// Fog address, normal sleep interval, and error sleep interval (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationPolicy {
    /// Host[:port] of the control plane.
    pub fog_address: String,
    /// Whether the connection to `fog_address` uses TLS.
    #[serde(default = "default_true")]
    pub fog_ssl: bool,
    /// Sleep between successful ticks, in seconds.
    #[serde(default = "default_sleep_secs")]
    pub sleep_interval_secs: u64,
    /// Sleep after a failed POLL (before the failure multiplier), in
    /// seconds.
    #[serde(default = "default_error_sleep_secs")]
    pub error_sleep_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_sleep_secs() -> u64 {
    DEFAULT_SLEEP_INTERVAL.as_secs()
}

fn default_error_sleep_secs() -> u64 {
    DEFAULT_ERROR_SLEEP_INTERVAL.as_secs()
}

impl OrchestrationPolicy {
    /// The configured normal sleep interval.
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_interval_secs)
    }

    /// The configured error sleep interval.
    pub fn error_sleep_interval(&self) -> Duration {
        Duration::from_secs(self.error_sleep_interval_secs)
    }
}

/// Load the orchestration policy from `policy_file`, falling back to its
/// `.bk` backup, and finally synthesizing a minimal policy from
/// `general_policy_file` (a profile setting carrying at least a fog
/// address) if neither exists (spec §4.J's START stage).
pub fn load_orchestration_policy(
    policy_file: &std::path::Path,
    general_policy_file: &std::path::Path,
) -> Result<OrchestrationPolicy> {
    if orchestration_tools::non_empty_file(policy_file) {
        return Ok(orchestration_tools::json_to_object(policy_file)?);
    }

    let backup = orchestration_tools::backup_path(policy_file);
    if orchestration_tools::non_empty_file(&backup) {
        return Ok(orchestration_tools::json_to_object(&backup)?);
    }

    if orchestration_tools::non_empty_file(general_policy_file) {
        let value: serde_json::Value = serde_json::from_str(&orchestration_tools::read_file(general_policy_file)?)
            .map_err(|e| Error::ConfigInvalid(format!("general policy file is not valid JSON: {e}")))?;
        let fog_address = value
            .get("fog_address")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::ConfigInvalid("general policy file has no fog_address".to_string()))?
            .to_string();
        return Ok(OrchestrationPolicy {
            fog_address,
            fog_ssl: value.get("fog_ssl").and_then(|v| v.as_bool()).unwrap_or(true),
            sleep_interval_secs: default_sleep_secs(),
            error_sleep_interval_secs: default_error_sleep_secs(),
        });
    }

    Err(Error::ConfigInvalid(
        "no orchestration policy, backup, or general policy file found".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_primary_policy_when_present() {
        let dir = tempdir().unwrap();
        let policy_file = dir.path().join("policy.json");
        orchestration_tools::object_to_json(
            &OrchestrationPolicy {
                fog_address: "fog.example.com:443".to_string(),
                fog_ssl: true,
                sleep_interval_secs: 30,
                error_sleep_interval_secs: 10,
            },
            &policy_file,
        )
        .unwrap();

        let policy = load_orchestration_policy(&policy_file, &dir.path().join("general.json")).unwrap();
        assert_eq!(policy.fog_address, "fog.example.com:443");
    }

    #[test]
    fn falls_back_to_backup_when_primary_missing() {
        let dir = tempdir().unwrap();
        let policy_file = dir.path().join("policy.json");
        let backup = orchestration_tools::backup_path(&policy_file);
        orchestration_tools::object_to_json(
            &OrchestrationPolicy {
                fog_address: "backup.example.com:443".to_string(),
                fog_ssl: true,
                sleep_interval_secs: 30,
                error_sleep_interval_secs: 10,
            },
            &backup,
        )
        .unwrap();

        let policy = load_orchestration_policy(&policy_file, &dir.path().join("general.json")).unwrap();
        assert_eq!(policy.fog_address, "backup.example.com:443");
    }

    #[test]
    fn synthesizes_from_general_policy_when_nothing_else_exists() {
        let dir = tempdir().unwrap();
        let general = dir.path().join("general.json");
        orchestration_tools::write_file(r#"{"fog_address":"general.example.com:443"}"#, &general, false)
            .unwrap();

        let policy = load_orchestration_policy(&dir.path().join("policy.json"), &general).unwrap();
        assert_eq!(policy.fog_address, "general.example.com:443");
        assert_eq!(policy.sleep_interval_secs, DEFAULT_SLEEP_INTERVAL.as_secs());
    }

    #[test]
    fn fails_when_nothing_is_found() {
        let dir = tempdir().unwrap();
        let result = load_orchestration_policy(&dir.path().join("policy.json"), &dir.path().join("general.json"));
        assert!(result.is_err());
    }
}
