// src/utils/waiter.rs

//! Readiness polling for globals that load asynchronously.
//!
//! Every wait in the engine (CMP, player SDKs, chatbot, chat button) goes
//! through [`await_ready`], so the timing policy lives in one place.

use crate::error::{AppError, Result};
use crate::models::WaitPolicy;

/// Poll `probe` until it yields a value.
///
/// The probe runs once immediately, then once after each of
/// `policy.max_attempts` delays of `policy.interval_ms`. If none of those
/// probes succeed the wait fails with [`AppError::Timeout`]. Dropping the
/// returned future drops the pending timer with it.
pub async fn await_ready<T, F>(what: &str, policy: WaitPolicy, mut probe: F) -> Result<T>
where
    F: FnMut() -> Option<T>,
{
    if let Some(value) = probe() {
        return Ok(value);
    }

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval()).await;
        if let Some(value) = probe() {
            log::debug!("{} ready after {} attempt(s)", what, attempt);
            return Ok(value);
        }
    }

    log::debug!(
        "{} not ready within {}ms",
        what,
        policy.ceiling().as_millis()
    );
    Err(AppError::timeout(what, policy.max_attempts))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_resolves_immediately_when_ready() {
        let start = Instant::now();
        let probes = Cell::new(0);

        let value = await_ready("ready", WaitPolicy::default(), || {
            probes.set(probes.get() + 1);
            Some(7)
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(probes.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_on_later_attempt() {
        let start = Instant::now();
        let probes = Cell::new(0);

        let value = await_ready("later", WaitPolicy::new(100, 50), || {
            probes.set(probes.get() + 1);
            (probes.get() == 4).then_some("up")
        })
        .await
        .unwrap();

        assert_eq!(value, "up");
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_max_attempts() {
        let start = Instant::now();
        let delayed_probes = Cell::new(0u32);
        let first = Cell::new(true);

        let result: Result<()> = await_ready("never", WaitPolicy::new(100, 50), || {
            if !first.replace(false) {
                delayed_probes.set(delayed_probes.get() + 1);
            }
            None
        })
        .await;

        assert!(matches!(
            result,
            Err(AppError::Timeout { attempts: 50, .. })
        ));
        assert_eq!(delayed_probes.get(), 50);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_stops_polling() {
        let probes = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = probes.clone();

        let wait = await_ready("dropped", WaitPolicy::new(100, 50), move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            None::<()>
        });
        let _ = tokio::time::timeout(Duration::from_millis(250), wait).await;
        let seen = probes.load(std::sync::atomic::Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(probes.load(std::sync::atomic::Ordering::SeqCst), seen);
    }
}
