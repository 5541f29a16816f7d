//! The ten-step manifest update algorithm and the self-update hand-off
//! (spec §4.H), grounded on `manifest_controller.cc`'s stage ordering.

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod controller;
mod error;
mod ignore_file;
mod paths;

pub use controller::{ApplyOutcome, ManifestController, WLP_STANDALONE_SERVICE_NAME};
pub use error::{Error, Result};
pub use ignore_file::is_ignore_file;
pub use paths::{ManifestPaths, SELF_UPDATE_TEMP_EXT};
