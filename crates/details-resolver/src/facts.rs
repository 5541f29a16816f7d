//! Immutable host facts resolved once at init.

use serde::{Deserialize, Serialize};

/// A small closed enum of platforms the orchestrator ships on, determined at
/// build time rather than probed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux, the primary target.
    Linux,
    /// A containerized (Kubernetes/Docker) deployment.
    Container,
    /// An embedded gateway appliance image.
    Embedded,
}

impl Platform {
    /// Determine the platform this binary was built for.
    pub const fn current() -> Self {
        if cfg!(feature = "container-platform") {
            Platform::Container
        } else if cfg!(feature = "embedded-platform") {
            Platform::Embedded
        } else {
            Platform::Linux
        }
    }
}

/// Immutable facts about the host the agent is running on, resolved once at
/// init and reused for registration and metadata reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFacts {
    /// The host's reported hostname.
    pub hostname: String,
    /// The build-time platform tag.
    pub platform: Platform,
    /// CPU architecture (`x86_64`, `aarch64`, ...).
    pub arch: String,
    /// This agent binary's own version string.
    pub agent_version: String,
}

impl AgentFacts {
    /// Resolve the facts for the current process.
    pub fn resolve(agent_version: impl Into<String>) -> Self {
        Self {
            hostname: hostname(),
            platform: Platform::current(),
            arch: std::env::consts::ARCH.to_string(),
            agent_version: agent_version.into(),
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .unwrap_or_else(|| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_without_panicking() {
        let facts = AgentFacts::resolve("1.2.3");
        assert!(!facts.hostname.is_empty());
        assert_eq!(facts.agent_version, "1.2.3");
    }
}
