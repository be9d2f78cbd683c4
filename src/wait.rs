//! Bounded polling of remote resource state.
//!
//! Every asynchronous resource (EKS cluster, node group, NAT gateway, RDS
//! instance) is polled at a fixed interval until it reaches the desired
//! condition or the attempt budget is exhausted. Cancellation is honored at
//! every sleep boundary.

use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Polling knobs for one resource kind.
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    /// Delay between checks.
    pub interval: Duration,
    /// Number of checks before giving up.
    pub max_checks: u32,
}

impl WaitConfig {
    pub const fn new(interval_secs: u64, max_checks: u32) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            max_checks,
        }
    }
}

/// Poll `check` until it reports the condition met, the check budget runs
/// out, or the token is cancelled.
///
/// `check` returns `Ok(Some(value))` when the condition is met, `Ok(None)`
/// to keep polling, and `Err` to abort immediately. The timeout error names
/// the resource so the operator knows what never settled.
pub async fn wait_for_condition<T, F, Fut>(
    config: WaitConfig,
    cancel: &CancellationToken,
    resource_name: &str,
    check: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for attempt in 1..=config.max_checks {
        if cancel.is_cancelled() {
            bail!("wait for {resource_name} cancelled");
        }
        if let Some(value) = check().await? {
            return Ok(value);
        }
        debug!(
            resource = %resource_name,
            attempt,
            max_checks = config.max_checks,
            "condition not met, retrying"
        );
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = cancel.cancelled() => bail!("wait for {resource_name} cancelled"),
        }
    }
    bail!("{resource_name} condition check timed out")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn succeeds_once_condition_met() {
        let polls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let value = wait_for_condition(WaitConfig::new(15, 10), &cancel, "widget", || async {
            let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(if n >= 3 { Some("ready") } else { None })
        })
        .await
        .unwrap();
        assert_eq!(value, "ready");
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_and_names_the_resource() {
        let cancel = CancellationToken::new();
        let err = wait_for_condition::<(), _, _>(
            WaitConfig::new(15, 4),
            &cancel,
            "nat gateway",
            || async { Ok(None) },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("nat gateway"));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn check_error_aborts_immediately() {
        let polls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let err = wait_for_condition::<(), _, _>(
            WaitConfig::new(15, 10),
            &cancel,
            "cluster",
            || async {
                polls.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("describe failed")
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("describe failed"));
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_sleep() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = wait_for_condition::<(), _, _>(
            WaitConfig::new(15, 10),
            &cancel,
            "cluster",
            || async { Ok(None) },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
