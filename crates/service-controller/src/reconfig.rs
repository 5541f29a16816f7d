//! The reconfiguration record and its table: one entry per outstanding
//! reload, keyed by a monotonic `configuration_id` (spec §3).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Terminal/in-flight status of one reconfiguration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconfStatus {
    /// The service accepted the request but has not yet finished applying
    /// it; a later callback to `/set-reconf-status` will report the
    /// terminal outcome.
    InProgress,
    /// The service finished applying the new configuration successfully.
    Succeeded,
    /// The service finished applying the new configuration and reported an
    /// error, or a transport failure occurred while dispatching the
    /// request.
    Failed,
    /// The liveness probe found the service not active before the request
    /// was even sent; the service has been removed from the registry.
    Inactive,
}

impl ReconfStatus {
    /// Whether this status is terminal (no further callback is expected).
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReconfStatus::InProgress)
    }
}

/// One outstanding (or completed) reload request.
#[derive(Debug, Clone)]
pub struct ReconfigurationRecord {
    /// Monotonically increasing id assigned at dispatch.
    pub configuration_id: u64,
    /// The service the request was sent to.
    pub service_name: String,
    /// The service id the request was sent to.
    pub service_id: String,
    /// Current status.
    pub status: ReconfStatus,
    /// The error message reported by the service, if `status == Failed`
    /// and the service itself reported one (as opposed to a transport
    /// failure, whose message is synthesized by the caller).
    pub error_message: Option<String>,
}

/// Table of outstanding reconfiguration records, addressed by
/// `configuration_id`. The `/set-reconf-status` REST callback updates the
/// same record a dispatch created.
#[derive(Default)]
pub struct ReconfigurationTable {
    next_id: AtomicU64,
    records: RwLock<HashMap<u64, ReconfigurationRecord>>,
}

impl ReconfigurationTable {
    /// Build an empty table.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a new `configuration_id` and register a record for
    /// `service_name`/`service_id`, initially `InProgress`.
    pub fn begin(&self, service_name: impl Into<String>, service_id: impl Into<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.write().expect("reconfig table lock poisoned").insert(
            id,
            ReconfigurationRecord {
                configuration_id: id,
                service_name: service_name.into(),
                service_id: service_id.into(),
                status: ReconfStatus::InProgress,
                error_message: None,
            },
        );
        id
    }

    /// Overwrite the status (and optional error message) of an existing
    /// record. Used both by the immediate-response transitions and by the
    /// `/set-reconf-status` callback.
    pub fn set_status(&self, configuration_id: u64, status: ReconfStatus, error_message: Option<String>) {
        if let Some(record) = self
            .records
            .write()
            .expect("reconfig table lock poisoned")
            .get_mut(&configuration_id)
        {
            record.status = status;
            record.error_message = error_message;
        }
    }

    /// Snapshot of a single record, if it exists.
    pub fn get(&self, configuration_id: u64) -> Option<ReconfigurationRecord> {
        self.records
            .read()
            .expect("reconfig table lock poisoned")
            .get(&configuration_id)
            .cloned()
    }

    /// Snapshot of every record currently tracked for the given set of ids,
    /// used by the batched-reload poll loop.
    pub fn snapshot(&self, ids: &[u64]) -> Vec<ReconfigurationRecord> {
        let records = self.records.read().expect("reconfig table lock poisoned");
        ids.iter().filter_map(|id| records.get(id).cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_assigns_increasing_ids() {
        let table = ReconfigurationTable::new();
        let a = table.begin("svc", "svc");
        let b = table.begin("svc", "svc");
        assert!(b > a);
    }

    #[test]
    fn set_status_updates_existing_record() {
        let table = ReconfigurationTable::new();
        let id = table.begin("svc", "svc");
        table.set_status(id, ReconfStatus::Succeeded, None);
        assert_eq!(table.get(id).unwrap().status, ReconfStatus::Succeeded);
    }

    #[test]
    fn in_progress_is_not_terminal() {
        assert!(!ReconfStatus::InProgress.is_terminal());
        assert!(ReconfStatus::Succeeded.is_terminal());
        assert!(ReconfStatus::Failed.is_terminal());
        assert!(ReconfStatus::Inactive.is_terminal());
    }
}
