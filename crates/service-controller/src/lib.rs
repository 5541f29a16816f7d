//! The nano-service registry, hot-reload RPC, reconfiguration state
//! machine, and multi-tenant policy fan-out.
//!
//! Grounded on `service-registry::registry::Registry` (in-memory map +
//! state-transition validation + event emission shape) generalized from
//! Docker/process lifecycle states to the INACTIVE/FAILED/SUCCEEDED/
//! IN_PROGRESS reconfiguration states, and on `service_details.h`/
//! `service_controller.cc` for the exact liveness-probe output parsing.

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod controller;
mod error;
mod liveness;
mod reconfig;
mod registry;
mod reload;
mod tenant;

pub use controller::{
    config_file_from_disk, BatchOutcome, ConfigFile, ServiceController, ServiceOutcome,
    DEFAULT_BATCH_TIMEOUT, POLL_INTERVAL,
};
pub use error::{Error, Result};
pub use liveness::{
    is_service_active, parse_status, probe_launch_error, ShellWatchdogQuery, WatchdogQuery,
    DEFAULT_TIMEOUT, MAX_RETRY_ATTEMPTS,
};
pub use reconfig::{ReconfStatus, ReconfigurationRecord, ReconfigurationTable};
pub use registry::{ServiceDetails, ServiceRegistry};
pub use reload::ReloadClient;
pub use tenant::{collect_garbage, TenantManager, DEFAULT_GC_INTERVAL};
