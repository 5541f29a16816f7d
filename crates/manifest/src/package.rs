//! Immutable descriptor of one installable artifact.

use crate::error::{Error, Result};
use orchestration_tools::ChecksumType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("static regex"))
}

/// The kind of artifact a [`Package`] installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    /// A nano-service binary.
    Service,
    /// A shared object consumed by one or more services.
    SharedObject,
}

impl PackageType {
    /// Parse the wire string, failing on anything unrecognized.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "service" => Ok(Self::Service),
            "shared_object" => Ok(Self::SharedObject),
            other => Err(Error::UnknownPackageType(other.to_string())),
        }
    }
}

/// The orchestrator's own service name; never listed for removal in a
/// manifest diff because it must remove itself through the self-update path.
pub const ORCHESTRATION_SERVICE_NAME: &str = "orchestration";

/// Wire representation of [`Package`], mirroring the forward/backward
/// compatible JSON contract: `relative-path`, `require`, `status`, `message`
/// are all optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPackage {
    name: String,
    version: String,
    #[serde(rename = "download-path")]
    download_path: String,
    #[serde(rename = "relative-path", default)]
    relative_path: Option<String>,
    #[serde(rename = "checksum-type")]
    checksum_type: String,
    checksum: String,
    #[serde(rename = "type")]
    package_type: String,
    #[serde(default)]
    require: Vec<String>,
    #[serde(default = "default_status")]
    status: bool,
    #[serde(default)]
    message: Option<String>,
}

fn default_status() -> bool {
    true
}

/// An installable artifact: a service binary or a shared object it depends
/// on.
///
/// Equality is load-bearing: two packages are equal iff their
/// `checksum_type` and `checksum` match, regardless of name, version, or
/// path — this is how the diff layer detects "same artifact under a
/// possibly different filename".
#[derive(Debug, Clone)]
pub struct Package {
    /// Identifier restricted to `[A-Za-z0-9._-]`.
    pub name: String,
    /// Human-readable version string.
    pub version: String,
    /// Absolute path or URL the artifact is fetched from.
    pub download_path: String,
    /// Path the artifact is installed to, relative to the packages root.
    pub relative_path: Option<String>,
    /// Declared checksum algorithm.
    pub checksum_type: ChecksumType,
    /// Declared checksum of the artifact.
    pub checksum: String,
    /// Service or shared object.
    pub package_type: PackageType,
    /// Ordered list of dependency package names.
    pub require: Vec<String>,
    /// `Ok(())` if installable; `Err(message)` if installation must be
    /// skipped (the fog marked `status=false`).
    pub installable: std::result::Result<(), String>,
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.checksum_type == other.checksum_type && self.checksum == other.checksum
    }
}

impl Eq for Package {}

impl Package {
    /// Validate `name` against the allowed character set.
    pub fn validate_name(name: &str) -> Result<()> {
        if name_pattern().is_match(name) {
            Ok(())
        } else {
            Err(Error::InvalidName(name.to_string()))
        }
    }

    /// Whether this is the orchestrator's own service package.
    pub fn is_self(&self) -> bool {
        self.name == ORCHESTRATION_SERVICE_NAME
    }
}

impl TryFrom<RawPackage> for Package {
    type Error = Error;

    fn try_from(raw: RawPackage) -> Result<Self> {
        Package::validate_name(&raw.name)?;
        let checksum_type = ChecksumType::parse(&raw.checksum_type)?;
        let package_type = PackageType::parse(&raw.package_type)?;
        let installable = if raw.status {
            Ok(())
        } else {
            Err(raw.message.unwrap_or_else(|| "installation disabled".to_string()))
        };

        Ok(Package {
            name: raw.name,
            version: raw.version,
            download_path: raw.download_path,
            relative_path: raw.relative_path,
            checksum_type,
            checksum: raw.checksum,
            package_type,
            require: raw.require,
            installable,
        })
    }
}

impl From<&Package> for RawPackage {
    fn from(pkg: &Package) -> Self {
        let (status, message) = match &pkg.installable {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg.clone())),
        };
        RawPackage {
            name: pkg.name.clone(),
            version: pkg.version.clone(),
            download_path: pkg.download_path.clone(),
            relative_path: pkg.relative_path.clone(),
            checksum_type: pkg.checksum_type.as_str().to_string(),
            checksum: pkg.checksum.clone(),
            package_type: match pkg.package_type {
                PackageType::Service => "service".to_string(),
                PackageType::SharedObject => "shared_object".to_string(),
            },
            require: pkg.require.clone(),
            status,
            message,
        }
    }
}

impl Serialize for Package {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        RawPackage::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Package {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawPackage::deserialize(deserializer)?;
        Package::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, checksum: &str) -> Package {
        Package {
            name: name.to_string(),
            version: "1.0".to_string(),
            download_path: "/tmp/x".to_string(),
            relative_path: None,
            checksum_type: ChecksumType::Sha256,
            checksum: checksum.to_string(),
            package_type: PackageType::Service,
            require: vec![],
            installable: Ok(()),
        }
    }

    #[test]
    fn equality_is_by_checksum_only() {
        let mut a = pkg("a", "h1");
        let b = pkg("b", "h1");
        assert_eq!(a, b);
        a.checksum = "h2".to_string();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_name_rejected() {
        assert!(Package::validate_name("weird name!").is_err());
        assert!(Package::validate_name("weird.name-1_2").is_ok());
    }

    #[test]
    fn status_false_becomes_err_installable() {
        let json = serde_json::json!({
            "name": "p1",
            "version": "1.0",
            "download-path": "/x",
            "checksum-type": "sha256",
            "checksum": "abc",
            "type": "service",
            "status": false,
            "message": "blocked by policy"
        });
        let p: Package = serde_json::from_value(json).unwrap();
        assert_eq!(p.installable, Err("blocked by policy".to_string()));
    }

    #[test]
    fn unknown_checksum_type_fails_to_load() {
        let json = serde_json::json!({
            "name": "p1",
            "version": "1.0",
            "download-path": "/x",
            "checksum-type": "sha3",
            "checksum": "abc",
            "type": "service",
        });
        assert!(serde_json::from_value::<Package>(json).is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let p = pkg("a", "h1");
        let json = serde_json::to_string(&p).unwrap();
        let back: Package = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, p.name);
        assert_eq!(back, p);
    }
}
