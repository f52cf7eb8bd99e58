use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Marks one refresh as running. Overlapping attempts are refused instead of
/// queued.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    running: Arc<AtomicBool>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag on drop, including when the refresh fails.
#[derive(Debug)]
pub struct InFlightGuard {
    running: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Calls `refresh` every `period`, skipping ticks while the previous run (or
/// any other holder of `in_flight`) has not settled.
pub fn spawn_refresh_loop<F, Fut>(period: Duration, in_flight: InFlight, mut refresh: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("auto-refresh every {period:?}");
        loop {
            interval.tick().await;
            let Some(guard) = in_flight.try_begin() else {
                debug!("refresh still in flight; skipping tick");
                continue;
            };
            let run = refresh();
            tokio::spawn(async move {
                run.await;
                drop(guard);
            });
        }
    })
}
