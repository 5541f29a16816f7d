//! Bounded-timeout wrapper shared by every on-demand probe.
//!
//! A failed or slow probe returns `None` ("unknown") and never blocks the
//! main loop, per spec §4.E.

use std::future::Future;
use std::time::Duration;

/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(300);

/// Race `fut` against a `timeout`-duration sleep; returns `None` if the
/// timeout wins or `fut` itself yields `None`.
pub async fn probe<T, F>(timeout: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Option<T>>,
{
    let timer = async_io::Timer::after(timeout);
    futures_lite::future::or(fut, async {
        timer.await;
        None
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[smol_potat::test]
    async fn fast_probe_returns_value() {
        let result = probe(DEFAULT_PROBE_TIMEOUT, async { Some(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[smol_potat::test]
    async fn slow_probe_times_out_to_none() {
        let result = probe(StdDuration::from_millis(10), async {
            async_io::Timer::after(StdDuration::from_secs(5)).await;
            Some(42)
        })
        .await;
        assert_eq!(result, None);
    }
}
