//! The nano-service registry: `pending`/`registered` maps, self-registration,
//! and the promotion that persists the merged registered set to
//! `orchestrations_registered_services.json` (spec §4.I).
//!
//! Grounded on `service-registry::registry::Registry`'s in-memory map +
//! state-transition validation + event emission shape, generalized from
//! Docker/process lifecycle states to self-registration/promotion.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::info;

/// Per locally registered nano-service (spec §3's `ServiceDetails`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDetails {
    /// The service's self-reported name.
    pub service_name: String,
    /// The service's self-reported id, defaulting to `service_name`.
    pub service_id: String,
    /// The port the service listens on for the hot-reload RPC.
    pub listening_port: u16,
    /// The set of policy-file base-names this service cares about.
    pub relevant_configs: HashSet<String>,
}

impl ServiceDetails {
    /// Build a service record, defaulting `service_id` to `service_name`
    /// when none is supplied (mirrors `SetNanoServiceConfig`'s optional
    /// `service_id` parameter).
    pub fn new(
        service_name: impl Into<String>,
        service_id: Option<String>,
        listening_port: u16,
        relevant_configs: impl IntoIterator<Item = String>,
    ) -> Self {
        let service_name = service_name.into();
        Self {
            service_id: service_id.unwrap_or_else(|| service_name.clone()),
            service_name,
            listening_port,
            relevant_configs: relevant_configs.into_iter().collect(),
        }
    }

    /// Whether this service cares about `config` (a policy-file base-name).
    pub fn is_configuration_relevant(&self, config: &str) -> bool {
        self.relevant_configs.contains(config)
    }

    /// Family id / uuid parsed out of `service_id`, used to parameterize
    /// the watchdog-query liveness probe. The original service id encodes
    /// these as `<family_id>_<uuid>`; services that never set one return
    /// `None` for both.
    pub fn family_and_uuid(&self) -> (Option<&str>, Option<&str>) {
        match self.service_id.split_once('_') {
            Some((family, uuid)) if !family.is_empty() && !uuid.is_empty() => {
                (Some(family), Some(uuid))
            }
            _ => (None, None),
        }
    }
}

/// The two-map registry: `pending` (just self-registered, not yet fanned
/// out to) and `registered` (promoted, source of truth for reload/GC).
///
/// All access is single-task cooperative per spec §5; the lock exists so a
/// parallel-thread port (per spec §9) only has to protect one resource.
pub struct ServiceRegistry {
    state: RwLock<State>,
    persisted_file: PathBuf,
}

struct State {
    pending: HashMap<String, ServiceDetails>,
    registered: HashMap<String, ServiceDetails>,
}

impl ServiceRegistry {
    /// Build a registry persisting the registered set to `persisted_file`
    /// (`conf/orchestrations_registered_services.json`), loading whatever
    /// was last persisted as the recovery-on-restart source of truth.
    pub fn new(persisted_file: impl Into<PathBuf>) -> Self {
        let persisted_file = persisted_file.into();
        let registered = orchestration_tools::load_map_from_json(&persisted_file).unwrap_or_default();
        Self {
            state: RwLock::new(State {
                pending: HashMap::new(),
                registered,
            }),
            persisted_file,
        }
    }

    /// Insert a self-registering service into `pending` (spec's
    /// `registerServiceConfig`). A service re-registering under the same
    /// name simply overwrites its prior pending entry.
    pub fn register_service_config(&self, details: ServiceDetails) {
        info!(service = %details.service_name, port = details.listening_port, "service self-registered");
        self.state
            .write()
            .expect("registry lock poisoned")
            .pending
            .insert(details.service_name.clone(), details);
    }

    /// Atomically move every pending service into `registered` and persist
    /// the merged set. Idempotent: called at the start of every
    /// `update_service_configuration` batch (spec §5's ordering guarantee).
    pub fn refresh_pending_services(&self) -> Result<()> {
        let merged = {
            let mut state = self.state.write().expect("registry lock poisoned");
            for (name, details) in state.pending.drain() {
                state.registered.insert(name, details);
            }
            state.registered.clone()
        };
        orchestration_tools::map_to_json_file(&merged, &self.persisted_file)?;
        Ok(())
    }

    /// Remove a service from the registry (spec's INACTIVE/transport-failure
    /// removal path) and persist the result.
    pub fn remove_registered(&self, service_name: &str) -> Result<()> {
        {
            let mut state = self.state.write().expect("registry lock poisoned");
            state.registered.remove(service_name);
        }
        let snapshot = self.state.read().expect("registry lock poisoned").registered.clone();
        orchestration_tools::map_to_json_file(&snapshot, &self.persisted_file)?;
        Ok(())
    }

    /// All currently registered services, in no particular order.
    pub fn registered_services(&self) -> Vec<ServiceDetails> {
        self.state
            .read()
            .expect("registry lock poisoned")
            .registered
            .values()
            .cloned()
            .collect()
    }

    /// `name:port` pairs for every registered service (spec's `show
    /// all-service-ports` REST endpoint).
    pub fn service_ports(&self) -> Vec<(String, u16)> {
        self.state
            .read()
            .expect("registry lock poisoned")
            .registered
            .values()
            .map(|d| (d.service_name.clone(), d.listening_port))
            .collect()
    }

    /// Whether `pending` and `registered` are disjoint, per the testable
    /// invariant in spec §8 — holds after every `refresh_pending_services`
    /// call since the drain moves entries rather than copying them.
    pub fn pending_and_registered_disjoint(&self) -> bool {
        let state = self.state.read().expect("registry lock poisoned");
        state.pending.keys().all(|k| !state.registered.contains_key(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn svc(name: &str, port: u16) -> ServiceDetails {
        ServiceDetails::new(name, None, port, ["policy".to_string()])
    }

    #[test]
    fn register_then_refresh_promotes_and_persists() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("orchestrations_registered_services.json");
        let registry = ServiceRegistry::new(&file);

        registry.register_service_config(svc("svcX", 8080));
        assert!(registry.registered_services().is_empty());

        registry.refresh_pending_services().unwrap();
        assert_eq!(registry.registered_services().len(), 1);
        assert!(registry.pending_and_registered_disjoint());

        let persisted: HashMap<String, ServiceDetails> =
            orchestration_tools::load_map_from_json(&file).unwrap();
        assert!(persisted.contains_key("svcX"));
    }

    #[test]
    fn service_id_defaults_to_name() {
        let details = ServiceDetails::new("svcX", None, 8080, []);
        assert_eq!(details.service_id, "svcX");
    }

    #[test]
    fn family_and_uuid_parsed_from_underscore_id() {
        let details = ServiceDetails::new("svcX", Some("fam1_uuid1".to_string()), 8080, []);
        assert_eq!(details.family_and_uuid(), (Some("fam1"), Some("uuid1")));
    }

    #[test]
    fn family_and_uuid_absent_for_plain_id() {
        let details = ServiceDetails::new("svcX", Some("plain".to_string()), 8080, []);
        assert_eq!(details.family_and_uuid(), (None, None));
    }

    #[test]
    fn recovery_loads_persisted_registered_set() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("orchestrations_registered_services.json");
        let mut seed = HashMap::new();
        seed.insert("svcY".to_string(), svc("svcY", 9090));
        orchestration_tools::map_to_json_file(&seed, &file).unwrap();

        let registry = ServiceRegistry::new(&file);
        assert_eq!(registry.registered_services().len(), 1);
    }
}
