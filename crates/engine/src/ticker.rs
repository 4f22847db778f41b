//! Single-shot worker that drives a callback at a fixed cadence.

use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, sleep},
};

/// Drives a callback every `interval`, compensating for the callback's own
/// wall-clock cost so the cadence does not drift. The sleep races the stop
/// signal, so [`TickDriver::stop`] interrupts a waiting worker immediately
/// and joins it within a 2x interval budget.
pub struct TickDriver {
    stop: watch::Sender<bool>,
    worker: JoinHandle<()>,
    interval: Duration,
}

impl TickDriver {
    /// Spawns the worker. It sleeps for `offset` once, then enters the
    /// callback/sleep loop.
    pub fn start<F>(interval: Duration, offset: Duration, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, mut stop_signal) = watch::channel(false);

        let worker = tokio::spawn(async move {
            tokio::select! {
                _ = stop_signal.changed() => return,
                _ = sleep(offset) => {}
            }

            loop {
                if *stop_signal.borrow() {
                    return;
                }

                let started = Instant::now();
                callback();
                let cost = started.elapsed();

                let remaining = interval.checked_sub(cost).unwrap_or_else(|| {
                    log::warn!(
                        "tick callback overran its interval, cost={:?} interval={:?}",
                        cost,
                        interval
                    );

                    Duration::ZERO
                });

                tokio::select! {
                    _ = stop_signal.changed() => return,
                    _ = sleep(remaining) => {}
                }
            }
        });

        Self {
            stop,
            worker,
            interval,
        }
    }

    /// Signals the worker and joins it. Any in-progress callback finishes
    /// first; the join is abandoned with a warning after twice the interval.
    pub async fn stop(self) {
        let _ = self.stop.send(true);

        let mut worker = self.worker;
        if tokio::time::timeout(2 * self.interval, &mut worker)
            .await
            .is_err()
        {
            log::warn!("tick worker did not stop within budget, aborting it");
            worker.abort();
        }
    }
}
