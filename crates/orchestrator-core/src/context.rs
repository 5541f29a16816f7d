//! The capability registry assembled once at INIT (spec §9's ownership
//! model): every long-lived collaborator the main loop drives is
//! constructed here, from explicit paths and a policy document, and handed
//! to the loop as plain references — no global state, no lazy statics.

use crate::config::{AgentConfig, OrchestrationPolicy};
use crate::error::Result;
use details_resolver::AgentFacts;
use fog_auth::{AuthenticatorPaths, FogAuthenticator};
use manifest_controller::{ManifestController, ManifestPaths};
use orchestration_status::OrchestrationStatus;
use service_controller::{ServiceController, ShellWatchdogQuery, TenantManager};
use std::path::PathBuf;
use std::sync::Arc;
use update_communication::{CheckUpdateBackend, FogBackend};

/// Every long-lived collaborator one tick of the main loop needs, built
/// once at INIT and then shared for the life of the process.
pub struct OrchestrationContext {
    /// Static on-disk paths and the agent's own version.
    pub config: AgentConfig,
    /// Host facts reported at registration.
    pub facts: AgentFacts,
    /// Shared fog authenticator; [`fog_auth::spawn_refresher`] must be
    /// called on this exactly once, by the caller assembling the context.
    pub authenticator: Arc<FogAuthenticator>,
    /// The update backend POLL calls through (spec §9: chosen once at
    /// init, not swapped at runtime).
    pub backend: Arc<dyn CheckUpdateBackend>,
    /// Drives the ten-step manifest algorithm.
    pub manifest_controller: ManifestController,
    /// Drives batched service configuration rollout.
    pub service_controller: ServiceController,
    /// Tracks active (tenant, profile) pairs and their garbage collection.
    pub tenant_manager: TenantManager,
    /// Queries `cp-nano-watchdog` for service liveness.
    pub watchdog: ShellWatchdogQuery,
    /// The observable status record, persisted to disk and served over
    /// the local REST surface.
    pub status: OrchestrationStatus,
    /// Shared HTTP client used for ad hoc calls outside the backend
    /// abstraction (currently just `sendPolicyVersion`).
    pub http_client: reqwest::Client,
}

fn manifest_paths(config: &AgentConfig) -> ManifestPaths {
    ManifestPaths {
        manifest_file: config.conf_dir.join("manifest.json"),
        corrupted_file: config.conf_dir.join("corrupted_packages.json"),
        ignore_list_file: config.conf_dir.join("ignore-packages.txt"),
        packages_dir: config.packages_dir.clone(),
    }
}

fn watchdog_path(config: &AgentConfig) -> String {
    config
        .packages_dir
        .join("watchdog")
        .join("cp-nano-watchdog")
        .to_string_lossy()
        .into_owned()
}

impl OrchestrationContext {
    /// Assemble every collaborator for `config`/`policy`. The authenticator
    /// is returned un-established: the caller must `establish()` it (and
    /// spawn its refresher) as the next START step before any POLL call.
    pub fn build(config: AgentConfig, policy: &OrchestrationPolicy) -> Result<Self> {
        let facts = AgentFacts::resolve(config.agent_version.clone());

        let authenticator = Arc::new(FogAuthenticator::new(
            policy.fog_address.clone(),
            AuthenticatorPaths {
                credentials_file: config.conf_dir.join("fog_credentials.json"),
                registration_token_file: config.registration_token_file.clone(),
            },
        ));

        let backend: Arc<dyn CheckUpdateBackend> = Arc::new(FogBackend::new(
            policy.fog_address.clone(),
            Arc::clone(&authenticator),
            config.download_dir.clone(),
        ));

        let manifest_controller = ManifestController::new(manifest_paths(&config), Arc::clone(&backend));

        let registered_file = config.conf_dir.join("registered_services.json");
        let service_controller = ServiceController::new(registered_file);

        let tenant_manager = TenantManager::new();
        let watchdog = ShellWatchdogQuery::new(watchdog_path(&config));
        let status = OrchestrationStatus::new(config.conf_dir.join("orchestration_status.json"));

        Ok(Self {
            config,
            facts,
            authenticator,
            backend,
            manifest_controller,
            service_controller,
            tenant_manager,
            watchdog,
            status,
            http_client: reqwest::Client::new(),
        })
    }

    /// Registration metadata sent with `establish()`: host facts plus the
    /// conf-dir-relative paths the fog needs to know about this agent.
    pub fn registration_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "hostname": self.facts.hostname,
            "platform": self.facts.platform,
            "arch": self.facts.arch,
            "agentVersion": self.facts.agent_version,
        })
    }

    /// Path to the live policy file, the only one the orchestrator loop
    /// treats as the "is-last" stage of a batch (spec §4.J's apply
    /// ordering: settings, then data, then policy).
    pub fn policy_file(&self) -> PathBuf {
        self.config.conf_dir.join("policy.json")
    }

    /// Path to the live settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config.conf_dir.join("settings.json")
    }

    /// Path to the live data file.
    pub fn data_file(&self) -> PathBuf {
        self.config.conf_dir.join("data.json")
    }

    /// Path to the general (non-agent-specific) policy file consulted when
    /// synthesizing a fallback [`OrchestrationPolicy`].
    pub fn general_policy_file(&self) -> PathBuf {
        self.config.conf_dir.join("general_settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn policy() -> OrchestrationPolicy {
        OrchestrationPolicy {
            fog_address: "http://fog.example".to_string(),
            fog_ssl: false,
            sleep_interval_secs: 25,
            error_sleep_interval_secs: 15,
        }
    }

    #[test]
    fn build_assembles_every_collaborator_without_touching_the_network() {
        let dir = tempdir().unwrap();
        let config = AgentConfig {
            conf_dir: dir.path().join("conf"),
            download_dir: dir.path().join("downloads"),
            packages_dir: dir.path().join("packages"),
            registration_token_file: None,
            agent_version: "9.9.9".to_string(),
        };
        std::fs::create_dir_all(&config.conf_dir).unwrap();

        let context = OrchestrationContext::build(config, &policy()).unwrap();
        assert_eq!(context.facts.agent_version, "9.9.9");
        assert!(context.authenticator.access_token().is_none());
    }

    #[test]
    fn registration_metadata_carries_agent_version() {
        let dir = tempdir().unwrap();
        let config = AgentConfig {
            conf_dir: dir.path().join("conf"),
            download_dir: dir.path().join("downloads"),
            packages_dir: dir.path().join("packages"),
            registration_token_file: None,
            agent_version: "1.0.0".to_string(),
        };
        std::fs::create_dir_all(&config.conf_dir).unwrap();

        let context = OrchestrationContext::build(config, &policy()).unwrap();
        let metadata = context.registration_metadata();
        assert_eq!(metadata["agentVersion"], "1.0.0");
    }
}
