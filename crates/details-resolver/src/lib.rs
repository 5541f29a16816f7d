//! Host/platform facts used in registration and metadata reports.
//!
//! Immutable facts (hostname, platform, arch, agent version) are resolved
//! once at init via [`AgentFacts::resolve`]. Everything else is an on-demand
//! probe wrapped in [`timeout::probe`]'s bounded timeout, grounded on
//! `service-orchestration::health`'s timeout-bounded command pattern: a
//! failed probe returns `None` ("unknown") and never blocks the main loop.

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod cloud;
mod error;
mod facts;
mod nginx;
mod probes;
mod timeout;

pub use cloud::CloudMetadata;
pub use error::{Error, Result};
pub use facts::{AgentFacts, Platform};
pub use nginx::{parse_proxy_build_info, ProxyBuildInfo};
pub use probes::{
    checkpoint_version, is_gateway_not_vsx, is_reverse_proxy, kernel_major_at_least_3,
    CheckpointVersion,
};
pub use timeout::{probe, DEFAULT_PROBE_TIMEOUT};
