//! Filesystem, JSON, checksum, and base64 utility surface consumed by every
//! other orchestration crate.
//!
//! This crate has no notion of packages, manifests, or services of its
//! own — it is pure capability surface, wrapping `std::fs` and `serde_json`
//! behind small functions that return `Result` instead of panicking, so the
//! crates built on top of it never cross an unhandled-exception boundary.

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod checksum;
mod encoding;
mod error;
mod fs;
mod json;
mod tenant;
mod virtual_files;

pub use checksum::{
    calculate_checksum, calculate_checksum_bytes, calculate_checksum_if_present,
    calculate_checksum_str, ChecksumType, SELECTED_CHECKSUM_TYPE,
};
pub use encoding::{base64_decode, base64_encode};
pub use error::{Error, Result};
pub use fs::{
    backup_path, copy_file, create_directory, dir_exists, file_exists, non_empty_file,
    read_file, remove_directory, remove_file, write_file,
};
pub use json::{
    json_object_splitter, json_to_object, load_map_from_json, map_to_json_file, object_to_json,
};
pub use tenant::TenantProfilePair;
pub use virtual_files::{
    delete_virtual_tenant_profile_files, tenant_profile_dir_name, tenant_profile_settings_name,
};
