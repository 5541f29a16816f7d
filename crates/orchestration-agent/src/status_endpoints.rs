//! The local REST surface modeled as a trait (spec §6): self-registration,
//! the reload-callback, and the two `show` projections. The binary wires
//! this to whatever embedding HTTP framework is chosen; no concrete
//! transport ships here.

use orchestrator_core::OrchestrationContext;
use service_controller::ServiceDetails;

/// Operations the fog's local REST surface exposes against one running
/// agent process.
pub trait StatusEndpoints {
    /// `POST /register` — a nano-service announcing itself and its
    /// relevant configuration files.
    fn register_service(&self, details: ServiceDetails);

    /// `POST /set-reconf-status` — a service's terminal callback for a
    /// reconfiguration it previously answered `finished=false` to.
    fn set_reconf_status(&self, configuration_id: u64, finished: bool, error: bool, error_message: Option<String>);

    /// `GET /show/orchestration-status` — the flattened status projection.
    fn show_orchestration_status(&self) -> Vec<(String, String)>;

    /// `GET /show/all-service-ports` — every registered service's listening
    /// port.
    fn show_all_service_ports(&self) -> Vec<(String, u16)>;
}

/// [`StatusEndpoints`] backed directly by one [`OrchestrationContext`].
pub struct AgentEndpoints<'a> {
    context: &'a OrchestrationContext,
}

impl<'a> AgentEndpoints<'a> {
    /// Wrap `context` for REST dispatch.
    pub fn new(context: &'a OrchestrationContext) -> Self {
        Self { context }
    }
}

impl StatusEndpoints for AgentEndpoints<'_> {
    fn register_service(&self, details: ServiceDetails) {
        self.context.service_controller.registry().register_service_config(details);
    }

    fn set_reconf_status(&self, configuration_id: u64, finished: bool, error: bool, error_message: Option<String>) {
        self.context
            .service_controller
            .report_reconf_status(configuration_id, finished, error, error_message);
    }

    fn show_orchestration_status(&self) -> Vec<(String, String)> {
        orchestration_status::flatten_for_display(&self.context.status.snapshot())
    }

    fn show_all_service_ports(&self) -> Vec<(String, u16)> {
        self.context.service_controller.registry().service_ports()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::{AgentConfig, OrchestrationPolicy};

    fn build_context(root: &std::path::Path) -> OrchestrationContext {
        let config = AgentConfig {
            conf_dir: root.join("conf"),
            download_dir: root.join("downloads"),
            packages_dir: root.join("packages"),
            registration_token_file: None,
            agent_version: "1.0.0".to_string(),
        };
        std::fs::create_dir_all(&config.conf_dir).unwrap();
        let policy = OrchestrationPolicy {
            fog_address: "http://fog.example".to_string(),
            fog_ssl: false,
            sleep_interval_secs: 25,
            error_sleep_interval_secs: 15,
        };
        OrchestrationContext::build(config, &policy).unwrap()
    }

    #[test]
    fn register_service_is_visible_after_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let context = build_context(dir.path());
        let endpoints = AgentEndpoints::new(&context);

        endpoints.register_service(ServiceDetails::new("svcA", None, 8080, ["policy".to_string()]));
        context.service_controller.registry().refresh_pending_services().unwrap();

        assert_eq!(endpoints.show_all_service_ports(), vec![("svcA".to_string(), 8080)]);
    }

    #[test]
    fn show_orchestration_status_reflects_fresh_record() {
        let dir = tempfile::tempdir().unwrap();
        let context = build_context(dir.path());
        let endpoints = AgentEndpoints::new(&context);

        let lines = endpoints.show_orchestration_status();
        assert!(lines.iter().any(|(k, _)| k == "Update status"));
    }
}
