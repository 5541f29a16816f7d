//! A thin polymorphic wrapper over three update backends (spec §4.G):
//! [`FogBackend`] (online), [`LocalBackend`] (offline staging directory),
//! and [`HybridBackend`] (fog-sourced manifest/software, locally-derived
//! policy). Mode selection is a tagged choice made once at process init —
//! switching modes is a restart-level operation, not a runtime trait-object
//! swap.

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod backend;
mod error;
mod fog;
mod hybrid;
mod local;
mod model;

pub use backend::CheckUpdateBackend;
pub use error::{Error, Result};
pub use fog::FogBackend;
pub use hybrid::{watch_declarative_policy, ApplyPolicy, HybridBackend};
pub use local::LocalBackend;
pub use model::{ArtifactCheck, ArtifactUpdate, CheckUpdateRequest, CheckUpdateResponse};
