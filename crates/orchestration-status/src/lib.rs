//! The observable status record, its on-disk persistence, and a flattened
//! projection for the `show orchestration-status` REST endpoint.
//!
//! Grounded on `service_orchestration::state::StateManager`'s read/
//! write-lock-protected snapshot pattern, adapted from "deployment state"
//! to "agent status".

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod error;
mod status;

pub use error::{Error, Result};
pub use status::{
    flatten_for_display, OrchestrationStatus, OrchestrationStatusRecord, ServiceConfigChecksums,
    UpdateStatus,
};
