use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};

use super::StopHandle;
use crate::TRACING_TARGET_SIGNAL;

/// Runs `tick` every `period` on the current Tokio runtime until the returned
/// handle is stopped or `tick` returns `false`.
///
/// The first call happens one `period` from now. `running` is raised while
/// the task is alive. Without a runtime nothing is spawned and a no-op handle
/// is returned.
pub(crate) fn poll_every<F>(
    period: Duration,
    running: &Arc<AtomicBool>,
    name: &'static str,
    mut tick: F,
) -> StopHandle
where
    F: FnMut() -> bool + Send + 'static,
{
    let Ok(handle) = Handle::try_current() else {
        tracing::warn!(
            target: TRACING_TARGET_SIGNAL,
            poller = name,
            "No Tokio runtime available, polling disabled"
        );
        return StopHandle::noop();
    };

    let flag = Arc::clone(running);
    flag.store(true, Ordering::SeqCst);
    let task = handle.spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !tick() {
                break;
            }
        }
        flag.store(false, Ordering::SeqCst);
    });

    tracing::debug!(
        target: TRACING_TARGET_SIGNAL,
        poller = name,
        period_ms = period.as_millis() as u64,
        "Started poller"
    );

    let running = Arc::clone(running);
    StopHandle::new(move || {
        task.abort();
        running.store(false, Ordering::SeqCst);
        tracing::debug!(target: TRACING_TARGET_SIGNAL, poller = name, "Stopped poller");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_without_runtime_is_noop() {
        let running = Arc::new(AtomicBool::new(false));
        let stop = poll_every(Duration::from_millis(10), &running, "test", || true);
        assert!(!running.load(Ordering::SeqCst));
        stop.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_stopped() {
        let running = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ticks);
        let stop = poll_every(Duration::from_millis(100), &running, "test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        assert!(running.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        stop.stop();
        assert!(!running.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_false_ends_task() {
        let running = Arc::new(AtomicBool::new(false));
        let _stop = poll_every(Duration::from_millis(50), &running, "test", || false);

        tokio::time::sleep(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert!(!running.load(Ordering::SeqCst));
    }
}
