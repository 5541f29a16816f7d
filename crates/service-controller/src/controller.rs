//! Batched configuration rollout: write the new files, fan a reload out to
//! every relevant registered service, then poll until every dispatch
//! reaches a terminal state or the batch times out (spec §4.I).

use crate::error::{Error, Result};
use crate::liveness::WatchdogQuery;
use crate::reconfig::{ReconfStatus, ReconfigurationTable};
use crate::registry::{ServiceDetails, ServiceRegistry};
use crate::reload::ReloadClient;
use orchestration_tools::write_file;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default ceiling on how long a batch will poll for terminal status
/// (spec: 600 seconds).
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(600);

/// How long the batch poll loop cooperatively yields between status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A single policy or settings file to write before dispatching reloads,
/// identified by the base-name services declare in
/// [`ServiceDetails::relevant_configs`].
pub struct ConfigFile {
    /// The base-name used to match against `relevant_configs` (e.g.
    /// `"policy"`, `"settings"`).
    pub config_name: String,
    /// Full path to write the content to.
    pub path: PathBuf,
    /// The new file content.
    pub content: String,
}

/// The outcome of dispatching a reload to one service within a batch.
#[derive(Debug, Clone)]
pub struct ServiceOutcome {
    /// The service that was reloaded.
    pub service_name: String,
    /// The configuration id assigned to this dispatch.
    pub configuration_id: u64,
    /// Terminal (or last-observed) status.
    pub status: ReconfStatus,
    /// Error message, if any.
    pub error_message: Option<String>,
}

/// Result of an entire batch: every service that was reloaded and whether
/// the batch as a whole reached an all-terminal state before timing out.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Per-service outcomes.
    pub services: Vec<ServiceOutcome>,
    /// Whether every service reached a terminal state within the timeout.
    pub complete: bool,
}

impl BatchOutcome {
    /// Whether every dispatched service succeeded (a batch with no relevant
    /// services at all is vacuously successful).
    pub fn all_succeeded(&self) -> bool {
        self.complete
            && self
                .services
                .iter()
                .all(|s| s.status == ReconfStatus::Succeeded)
    }
}

/// Orchestrates registration, liveness, and reload for the set of
/// nano-services running on this host.
pub struct ServiceController {
    registry: ServiceRegistry,
    reconfig: ReconfigurationTable,
    reload: ReloadClient,
    batch_timeout: Duration,
}

impl ServiceController {
    /// Build a controller whose registry persists to `registered_file`.
    pub fn new(registered_file: impl Into<PathBuf>) -> Self {
        Self {
            registry: ServiceRegistry::new(registered_file),
            reconfig: ReconfigurationTable::new(),
            reload: ReloadClient::new(),
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }

    /// Override the batch poll timeout (primarily for tests).
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    /// Access to the underlying registry, e.g. for the REST `register`
    /// endpoint and the `show all-service-ports` projection.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Record the outcome of a `/set-reconf-status` callback: the terminal
    /// report a service sends once it finishes applying a configuration it
    /// previously answered `finished=false` to.
    pub fn report_reconf_status(
        &self,
        configuration_id: u64,
        finished: bool,
        error: bool,
        error_message: Option<String>,
    ) {
        let status = match (finished, error) {
            (true, false) => ReconfStatus::Succeeded,
            (true, true) => ReconfStatus::Failed,
            (false, _) => ReconfStatus::InProgress,
        };
        self.reconfig.set_status(configuration_id, status, error_message);
    }

    /// Write every file in `config_files`, promote any pending
    /// self-registrations, fan a reload out to every service whose
    /// `relevant_configs` intersects the written base-names (or to every
    /// registered service, if the batch includes a `"settings"` file), then
    /// poll until all dispatches are terminal or `batch_timeout` elapses.
    ///
    /// `config_files` should carry every file changed in the tick together
    /// (settings, data, policy), not one call per file — the reload set is
    /// computed over the whole batch, so a service that only cares about one
    /// of the changed files still gets reloaded when others changed too.
    ///
    /// `is_last` supports the multi-tenant fan-out case (spec §4.I): a caller
    /// batching several `(tenant, profile)` pairs writes each pair's files
    /// with `is_last = false` and only signals services on the final pair.
    pub async fn update_service_configuration(
        &self,
        watchdog: &dyn WatchdogQuery,
        config_files: &[ConfigFile],
        is_last: bool,
    ) -> Result<BatchOutcome> {
        for file in config_files {
            write_file(&file.content, &file.path, false)?;
        }

        self.registry.refresh_pending_services()?;

        if !is_last {
            return Ok(BatchOutcome {
                services: Vec::new(),
                complete: true,
            });
        }

        // Spec §4.I: a settings change fans out to every registered service,
        // not just the ones that list "settings" in `relevant_configs`.
        let settings_changed = config_files.iter().any(|f| f.config_name == "settings");

        let relevant: Vec<ServiceDetails> = self
            .registry
            .registered_services()
            .into_iter()
            .filter(|s| {
                settings_changed
                    || config_files.iter().any(|f| s.is_configuration_relevant(&f.config_name))
            })
            .collect();

        if relevant.is_empty() {
            return Ok(BatchOutcome {
                services: Vec::new(),
                complete: true,
            });
        }

        let policy_version = config_files
            .iter()
            .map(|f| f.content.as_str())
            .next()
            .unwrap_or_default();

        let mut in_flight = Vec::with_capacity(relevant.len());
        for service in &relevant {
            let configuration_id = self.reconfig.begin(&service.service_name, &service.service_id);
            let (status, message) = self
                .reload
                .dispatch(watchdog, service, configuration_id, policy_version)
                .await;
            self.reconfig.set_status(configuration_id, status, message.clone());

            if status == ReconfStatus::Inactive {
                self.registry.remove_registered(&service.service_name)?;
                warn!(service = %service.service_name, "service inactive at reload time, removed from registry");
            }

            in_flight.push((service.service_name.clone(), configuration_id));
        }

        let complete = self.poll_until_terminal(&in_flight).await;

        let ids: Vec<u64> = in_flight.iter().map(|(_, id)| *id).collect();
        let services = self
            .reconfig
            .snapshot(&ids)
            .into_iter()
            .map(|record| ServiceOutcome {
                service_name: record.service_name,
                configuration_id: record.configuration_id,
                status: record.status,
                error_message: record.error_message,
            })
            .collect();

        if !complete {
            return Err(Error::BatchTimeout(self.batch_timeout));
        }

        Ok(BatchOutcome { services, complete })
    }

    async fn poll_until_terminal(&self, in_flight: &[(String, u64)]) -> bool {
        let ids: Vec<u64> = in_flight.iter().map(|(_, id)| *id).collect();
        let deadline = self.batch_timeout;
        let mut elapsed = Duration::ZERO;

        loop {
            let snapshot = self.reconfig.snapshot(&ids);
            if snapshot.iter().all(|r| r.status.is_terminal()) {
                info!(count = snapshot.len(), "reconfiguration batch reached terminal state");
                return true;
            }
            if elapsed >= deadline {
                return false;
            }
            async_io::Timer::after(POLL_INTERVAL).await;
            elapsed += POLL_INTERVAL;
        }
    }
}

/// Load config-file content from disk into [`ConfigFile`] values, used by
/// callers assembling a batch from files already staged on disk rather than
/// in-memory content.
pub fn config_file_from_disk(config_name: impl Into<String>, path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref().to_path_buf();
    let content = orchestration_tools::read_file(&path)?;
    Ok(ConfigFile {
        config_name: config_name.into(),
        path,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceDetails;
    use tempfile::tempdir;

    struct AlwaysActiveAndFast;

    #[async_trait::async_trait]
    impl WatchdogQuery for AlwaysActiveAndFast {
        async fn query(
            &self,
            _details: &ServiceDetails,
            _timeout: Duration,
        ) -> std::result::Result<String, bool> {
            Ok("registered, running".to_string())
        }
    }

    struct AlwaysInactive;

    #[async_trait::async_trait]
    impl WatchdogQuery for AlwaysInactive {
        async fn query(
            &self,
            _details: &ServiceDetails,
            _timeout: Duration,
        ) -> std::result::Result<String, bool> {
            Ok("not-registered, not-running".to_string())
        }
    }

    #[smol_potat::test]
    async fn batch_with_no_relevant_services_completes_vacuously() {
        let dir = tempdir().unwrap();
        let controller = ServiceController::new(dir.path().join("registered.json"));
        let files = vec![ConfigFile {
            config_name: "policy".to_string(),
            path: dir.path().join("policy.json"),
            content: "v1".to_string(),
        }];

        let outcome = controller
            .update_service_configuration(&AlwaysActiveAndFast, &files, true)
            .await
            .unwrap();

        assert!(outcome.services.is_empty());
        assert!(outcome.all_succeeded());
        assert!(dir.path().join("policy.json").exists());
    }

    #[smol_potat::test]
    async fn non_last_stage_skips_reload_entirely() {
        let dir = tempdir().unwrap();
        let controller = ServiceController::new(dir.path().join("registered.json"));
        controller
            .registry()
            .register_service_config(ServiceDetails::new("svcA", None, 8080, ["policy".to_string()]));

        let files = vec![ConfigFile {
            config_name: "settings".to_string(),
            path: dir.path().join("settings.json"),
            content: "v1".to_string(),
        }];

        let outcome = controller
            .update_service_configuration(&AlwaysActiveAndFast, &files, false)
            .await
            .unwrap();

        assert!(outcome.services.is_empty());
        assert!(controller.registry().registered_services().iter().any(|s| s.service_name == "svcA"));
    }

    #[smol_potat::test]
    async fn inactive_service_is_removed_from_registry() {
        let dir = tempdir().unwrap();
        let controller = ServiceController::new(dir.path().join("registered.json"));
        controller
            .registry()
            .register_service_config(ServiceDetails::new("svcA", None, 8080, ["policy".to_string()]));
        controller.registry().refresh_pending_services().unwrap();

        let files = vec![ConfigFile {
            config_name: "policy".to_string(),
            path: dir.path().join("policy.json"),
            content: "v1".to_string(),
        }];

        let outcome = controller
            .update_service_configuration(&AlwaysInactive, &files, true)
            .await
            .unwrap();

        assert_eq!(outcome.services.len(), 1);
        assert_eq!(outcome.services[0].status, ReconfStatus::Inactive);
        assert!(controller.registry().registered_services().is_empty());
    }

    #[smol_potat::test]
    async fn settings_change_reloads_services_that_do_not_list_it() {
        let dir = tempdir().unwrap();
        let controller = ServiceController::new(dir.path().join("registered.json"));
        controller
            .registry()
            .register_service_config(ServiceDetails::new("svcA", None, 8080, ["policy".to_string()]));
        controller.registry().refresh_pending_services().unwrap();

        let files = vec![ConfigFile {
            config_name: "settings".to_string(),
            path: dir.path().join("settings.json"),
            content: "v1".to_string(),
        }];

        let outcome = controller
            .update_service_configuration(&AlwaysActiveAndFast, &files, true)
            .await
            .unwrap();

        assert_eq!(outcome.services.len(), 1);
        assert_eq!(outcome.services[0].service_name, "svcA");
    }

    #[smol_potat::test]
    async fn set_reconf_status_callback_resolves_an_in_progress_record() {
        let dir = tempdir().unwrap();
        let controller = ServiceController::new(dir.path().join("registered.json"));
        let id = controller.reconfig.begin("svcA", "svcA");
        assert_eq!(controller.reconfig.get(id).unwrap().status, ReconfStatus::InProgress);

        controller.report_reconf_status(id, true, false, None);
        assert_eq!(controller.reconfig.get(id).unwrap().status, ReconfStatus::Succeeded);
    }

    #[smol_potat::test]
    async fn terminal_dispatch_converges_on_first_poll() {
        // The reload POST itself fails fast (nothing listens on 8080 here),
        // which resolves to FAILED immediately, a terminal state reached on
        // the very first snapshot, even with a near-zero batch timeout.
        let dir = tempdir().unwrap();
        let controller = ServiceController::new(dir.path().join("registered.json"))
            .with_batch_timeout(Duration::from_millis(1));
        controller
            .registry()
            .register_service_config(ServiceDetails::new("svcA", None, 8080, ["policy".to_string()]));
        controller.registry().refresh_pending_services().unwrap();

        let files = vec![ConfigFile {
            config_name: "policy".to_string(),
            path: dir.path().join("policy.json"),
            content: "v1".to_string(),
        }];

        let outcome = controller
            .update_service_configuration(&AlwaysActiveAndFast, &files, true)
            .await
            .unwrap();

        assert_eq!(outcome.services.len(), 1);
        assert!(outcome.complete);
        assert_eq!(outcome.services[0].status, ReconfStatus::Failed);
    }
}
