//! Recurring task runner.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Spawn a named task that runs `f` every `period`.
///
/// Each run is awaited before the next tick is taken, so a task never
/// overlaps itself; ticks missed by a long run are skipped, not replayed.
/// The immediate first tick is consumed so the first run happens one full
/// period after startup.
pub fn spawn_recurring<F, Fut>(name: &'static str, period: Duration, mut f: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            debug!(task = name, "Task tick");
            f().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn runs_once_per_period() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        let handle = spawn_recurring("test", Duration::from_secs(10), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn no_run_before_first_period() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        let handle = spawn_recurring("test", Duration::from_secs(10), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        handle.abort();
    }
}
