//! The long-running on-host agent loop: INIT builds every collaborator
//! once, then START/POLL/APPLY/REPORT/SLEEP repeats for the life of the
//! process (spec §4.J).

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod audit;
mod backoff;
mod config;
mod context;
mod error;
mod fog_address;
#[path = "loop_.rs"]
mod loop_mod;

pub use audit::{manifest_failure, policy_updated, send_audit_events, AuditEvent};
pub use backoff::FailureCounter;
pub use config::{
    load_orchestration_policy, AgentConfig, OrchestrationPolicy, DEFAULT_ERROR_SLEEP_INTERVAL,
    DEFAULT_SLEEP_INTERVAL, START_RETRY_SLEEP,
};
pub use context::OrchestrationContext;
pub use error::{Error, Result};
pub use fog_address::{fog_address_changed, send_policy_version};
pub use loop_mod::{apply_update, fog_address_change, run_poll, run_start, run_tick, TickOutcome};
