//! Cancellable repeating timers.

use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// A repeating timer running as a tokio task. Dropping it cancels the timer.
///
/// The first tick fires one period after creation. Each tick's work runs as
/// its own task, so a slow tick never delays the next one and completions
/// may arrive out of order. Cancelling the timer also aborts ticks still in
/// flight.
#[derive(Debug)]
pub(crate) struct RepeatingTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Start a timer. `next_tick` is called at every period boundary and
    /// returns the tick's work, or `None` to stop the timer.
    pub(crate) fn spawn<F, Fut>(name: &'static str, period: Duration, mut next_tick: F) -> Self
    where
        F: FnMut() -> Option<Fut> + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // tokio::time::interval panics on a zero period.
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut in_flight = JoinSet::new();

            loop {
                interval.tick().await;

                // Reap finished ticks so the set does not grow unbounded.
                while in_flight.try_join_next().is_some() {}

                let Some(tick) = next_tick() else {
                    debug!(timer = name, "Timer stopped by its own check");
                    break;
                };
                in_flight.spawn(tick);
            }

            while in_flight.join_next().await.is_some() {}
        });

        debug!(timer = name, period_ms = period.as_millis(), "Timer started");
        Self { name, handle }
    }

    /// Whether the timer has stopped, by its own check or by cancellation.
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.handle.abort();
        debug!(timer = self.name, "Timer cancelled");
    }
}
