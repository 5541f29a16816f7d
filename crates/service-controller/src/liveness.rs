//! The watchdog-query liveness probe (spec §4.I's `isServiceActive`),
//! grounded on `service_controller.cc`'s `ServiceDetails::isServiceActive`:
//! run `cp-nano-watchdog --status --verbose --service <name> [--family
//! <fid> --id <uuid>]`, retry only on timeout with a growing per-attempt
//! budget, then parse the lowercased output for
//! `registered`/`not-registered` and `running`/`not-running`.

use crate::error::Error;
use crate::registry::ServiceDetails;
use command_executor::event::ProcessEventType;
use command_executor::launcher::Launcher;
use command_executor::process::ProcessHandle;
use command_executor::{backends::LocalLauncher, target::Target, Command};
use futures_lite::StreamExt;
use std::time::Duration;

/// Maximum number of retries after the first attempt (spec default: 5).
pub const MAX_RETRY_ATTEMPTS: u32 = 5;

/// Base per-attempt timeout; attempt `n` (0-indexed, after the first) waits
/// `DEFAULT_TIMEOUT * (n + 2)` (spec: `200ms * (n+2)`).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// A queryable watchdog, abstracted so tests can substitute canned output
/// without invoking a real binary.
#[async_trait::async_trait]
pub trait WatchdogQuery: Send + Sync {
    /// Run the status query for `details` with the given per-attempt
    /// timeout, returning `Ok(output)`, `Err(true)` on timeout (retryable),
    /// or `Err(false)` on any other failure (not retried).
    async fn query(&self, details: &ServiceDetails, timeout: Duration) -> std::result::Result<String, bool>;
}

/// Queries the real `cp-nano-watchdog` binary via [`command_executor`].
pub struct ShellWatchdogQuery {
    launcher: LocalLauncher,
    watchdog_path: String,
}

impl ShellWatchdogQuery {
    /// Build a query against the watchdog binary at `watchdog_path`
    /// (typically `<filesystem_prefix>/watchdog/cp-nano-watchdog`).
    pub fn new(watchdog_path: impl Into<String>) -> Self {
        Self {
            launcher: LocalLauncher,
            watchdog_path: watchdog_path.into(),
        }
    }

    fn build_command(&self, details: &ServiceDetails) -> Command {
        let mut cmd = Command::new(&self.watchdog_path);
        cmd.arg("--status").arg("--verbose").arg("--service").arg(&details.service_name);

        let (family, uuid) = details.family_and_uuid();
        match (family, uuid) {
            (Some(family), Some(uuid)) => {
                cmd.arg("--family").arg(family).arg("--id").arg(uuid);
            }
            (None, Some(uuid)) if uuid != details.service_name => {
                cmd.arg("--id").arg(uuid);
            }
            _ => {}
        }
        cmd
    }
}

#[async_trait::async_trait]
impl WatchdogQuery for ShellWatchdogQuery {
    async fn query(&self, details: &ServiceDetails, timeout: Duration) -> std::result::Result<String, bool> {
        let cmd = self.build_command(details);
        let (mut events, mut handle) = match self.launcher.launch(&Target::Command, cmd).await {
            Ok(pair) => pair,
            Err(_) => return Err(false),
        };

        // The collecting future owns `handle`; if the timeout wins the race
        // below, dropping it kills the still-running watchdog query
        // (`LocalProcessHandle`'s `Drop` impl kills on drop).
        let collect = async move {
            let mut output = String::new();
            while let Some(event) = events.next().await {
                if let ProcessEventType::Stdout = event.event_type {
                    if let Some(data) = event.data {
                        output.push_str(&data);
                        output.push('\n');
                    }
                }
            }
            let status = handle.wait().await;
            (output, status)
        };

        let timer = async_io::Timer::after(timeout);
        let outcome = futures_lite::future::or(async { Some(collect.await) }, async {
            timer.await;
            None
        })
        .await;

        match outcome {
            Some((output, Ok(status))) if status.success() => Ok(output),
            Some((_, _)) => Err(false),
            None => Err(true),
        }
    }
}

/// Parse watchdog output into `(is_registered, is_running)`, matching
/// `service_controller.cc`'s lowercased-substring logic exactly: a negated
/// form (`not-registered`/`not-running`) always wins over the bare form
/// even if both appear.
pub fn parse_status(output: &str) -> (bool, bool) {
    let lowered = output.to_lowercase();
    let is_registered = !lowered.contains("not-registered") && lowered.contains("registered");
    let is_running = !lowered.contains("not-running") && lowered.contains("running");
    (is_registered, is_running)
}

/// Probe `details`'s liveness, retrying up to [`MAX_RETRY_ATTEMPTS`] times
/// with a growing timeout if and only if the failure was a timeout. A
/// service is active iff the parsed output reports both registered and
/// running.
pub async fn is_service_active(query: &dyn WatchdogQuery, details: &ServiceDetails) -> bool {
    let mut timeout = DEFAULT_TIMEOUT;
    let mut attempt = 0;

    loop {
        match query.query(details, timeout).await {
            Ok(output) => {
                let (registered, running) = parse_status(&output);
                return registered && running;
            }
            Err(true) if attempt < MAX_RETRY_ATTEMPTS => {
                attempt += 1;
                timeout = DEFAULT_TIMEOUT * (attempt + 1);
            }
            Err(_) => return false,
        }
    }
}

/// Build a probe error for a watchdog that could not even be launched
/// (distinct from the timeout-then-inactive path, used only when the
/// caller needs to surface this as a hard error rather than treating the
/// service as inactive).
pub fn probe_launch_error(service: &str, source: command_executor::Error) -> Error {
    Error::ProbeExecutor {
        service: service.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn svc() -> ServiceDetails {
        ServiceDetails::new("svcX", None, 8080, [])
    }

    #[test]
    fn parse_status_requires_both_registered_and_running() {
        assert_eq!(parse_status("Registered. Running."), (true, true));
        assert_eq!(parse_status("not-registered, running"), (false, true));
        assert_eq!(parse_status("registered, not-running"), (true, false));
        assert_eq!(parse_status("unknown"), (false, false));
    }

    struct AlwaysTimeout {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl WatchdogQuery for AlwaysTimeout {
        async fn query(&self, _details: &ServiceDetails, _timeout: Duration) -> std::result::Result<String, bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(true)
        }
    }

    struct SucceedsOnThird {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl WatchdogQuery for SucceedsOnThird {
        async fn query(&self, _details: &ServiceDetails, _timeout: Duration) -> std::result::Result<String, bool> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(true)
            } else {
                Ok("registered, running".to_string())
            }
        }
    }

    struct NonTimeoutFailure;

    #[async_trait::async_trait]
    impl WatchdogQuery for NonTimeoutFailure {
        async fn query(&self, _details: &ServiceDetails, _timeout: Duration) -> std::result::Result<String, bool> {
            Err(false)
        }
    }

    #[smol_potat::test]
    async fn exhausting_retries_on_timeout_reports_inactive() {
        let q = AlwaysTimeout { calls: AtomicU32::new(0) };
        let active = is_service_active(&q, &svc()).await;
        assert!(!active);
        assert_eq!(q.calls.load(Ordering::SeqCst), MAX_RETRY_ATTEMPTS + 1);
    }

    #[smol_potat::test]
    async fn retries_stop_once_a_successful_query_is_parsed() {
        let q = SucceedsOnThird { calls: AtomicU32::new(0) };
        let active = is_service_active(&q, &svc()).await;
        assert!(active);
    }

    #[smol_potat::test]
    async fn non_timeout_failure_is_not_retried() {
        let q = NonTimeoutFailure;
        let active = is_service_active(&q, &svc()).await;
        assert!(!active);
    }
}
