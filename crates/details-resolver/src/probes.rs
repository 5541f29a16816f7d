//! On-demand host probes: reverse-proxy detection, kernel version, the
//! gateway-but-not-VSX configuration check, and the packed checkpoint
//! version comparator.

use crate::timeout::{probe, DEFAULT_PROBE_TIMEOUT};
use command_executor::{backends::LocalLauncher, target::Target, Command, Executor};
use std::cmp::Ordering;

/// Whether the host runs a reverse-proxy product, probed via
/// `REVERSE_PROXY_PRODUCT` or by checking for a known marker file.
pub async fn is_reverse_proxy() -> Option<bool> {
    probe(DEFAULT_PROBE_TIMEOUT, async {
        if let Ok(value) = std::env::var("REVERSE_PROXY_PRODUCT") {
            return Some(value == "1" || value.eq_ignore_ascii_case("true"));
        }
        Some(orchestration_tools::file_exists("/etc/cp-reverse-proxy-release"))
    })
    .await
}

/// Whether the host kernel's major version is >= 3, parsed from `uname -r`.
pub async fn kernel_major_at_least_3() -> Option<bool> {
    probe(DEFAULT_PROBE_TIMEOUT, async {
        let major = run_capture("uname", &["-r"]).await?;
        parse_kernel_major(&major).map(|m| m >= 3)
    })
    .await
}

fn parse_kernel_major(uname_output: &str) -> Option<u32> {
    uname_output
        .trim()
        .split(['.', '-'])
        .next()
        .and_then(|s| s.parse().ok())
}

/// Whether this host is a gateway appliance configured without VSX
/// (virtual-system extension), derived from an env var the platform sets.
pub async fn is_gateway_not_vsx() -> Option<bool> {
    probe(DEFAULT_PROBE_TIMEOUT, async {
        let is_gateway = std::env::var("CP_IS_GATEWAY").ok()?;
        let is_vsx = std::env::var("CP_IS_VSX").unwrap_or_else(|_| "0".to_string());
        Some(is_gateway == "1" && is_vsx != "1")
    })
    .await
}

/// A packed checkpoint appliance version (`major * 10000 + minor * 100 +
/// build`), comparable without parsing the original dotted string again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CheckpointVersion(pub u32);

impl CheckpointVersion {
    /// Pack `major.minor.build` into a single comparable integer.
    pub fn pack(major: u32, minor: u32, build: u32) -> Self {
        Self(major * 10_000 + minor * 100 + build)
    }

    /// Compare against another packed version.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Resolve the host's packed checkpoint version from a helper-provided
/// `major.minor.build` string, e.g. `R81.20.X10`.
pub async fn checkpoint_version(helper_script: &str) -> Option<CheckpointVersion> {
    probe(DEFAULT_PROBE_TIMEOUT, async {
        let raw = run_capture(helper_script, &[]).await?;
        parse_checkpoint_version(&raw)
    })
    .await
}

fn parse_checkpoint_version(raw: &str) -> Option<CheckpointVersion> {
    let raw = raw.trim().trim_start_matches('R');
    let mut parts = raw.split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    let build: u32 = parts
        .next()
        .and_then(|s| s.trim_start_matches(['X', 'x']).parse().ok())
        .unwrap_or(0);
    Some(CheckpointVersion::pack(major, minor, build))
}

async fn run_capture(program: &str, args: &[&str]) -> Option<String> {
    use command_executor::event::ProcessEventType;
    use futures_lite::StreamExt;

    let executor = Executor::new("details-resolver".to_string(), LocalLauncher);
    let mut cmd = Command::new(program);
    cmd.args(args);
    let (mut events, mut handle) = executor.spawn(&Target::Command, cmd).await.ok()?;

    let mut stdout = String::new();
    while let Some(event) = events.next().await {
        if event.event_type == ProcessEventType::Stdout {
            if let Some(line) = event.data {
                stdout.push_str(&line);
            }
        }
    }

    let status = handle.wait().await.ok()?;
    status.success().then_some(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kernel_major() {
        assert_eq!(parse_kernel_major("5.15.0-generic"), Some(5));
        assert_eq!(parse_kernel_major("2.6.32"), Some(2));
        assert_eq!(parse_kernel_major("garbage"), None);
    }

    #[test]
    fn checkpoint_version_compares_by_packed_value() {
        let older = CheckpointVersion::pack(81, 10, 5);
        let newer = CheckpointVersion::pack(81, 20, 1);
        assert_eq!(older.compare(&newer), Ordering::Less);
    }

    #[test]
    fn parses_checkpoint_version_string() {
        let v = parse_checkpoint_version("R81.20.X10").unwrap();
        assert_eq!(v, CheckpointVersion::pack(81, 20, 10));
    }
}
