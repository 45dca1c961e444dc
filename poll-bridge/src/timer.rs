//! Recurring timer owned by a single bridge
//!
//! Each bridge gets its own task driven by `tokio::time::interval_at`. The
//! task owns the tick callback, so callbacks run one at a time and never
//! overlap. Stopping flips a shared flag and aborts the task; a tick that is
//! already executing finishes first because the callback is synchronous.
//!
//! However the task ends (the callback breaks, `stop` aborts it, the runtime
//! shuts down and drops it, or it never gets to run) the exit hook passed to
//! [`PollTimer::spawn`] runs exactly once and the running flag reads false.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Owned by the task future, so it drops with it on every exit path
struct ExitGuard<G: FnOnce()> {
    running: Arc<AtomicBool>,
    on_exit: Option<G>,
}

impl<G: FnOnce()> Drop for ExitGuard<G> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(on_exit) = self.on_exit.take() {
            on_exit();
        }
    }
}

pub(crate) struct PollTimer {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    abort: AbortHandle,
}

impl PollTimer {
    /// Spawn the timer on `rt`
    ///
    /// The first tick fires one `period` after `start`, then every `period`.
    /// If a tick runs late the next one is pushed back rather than fired in a
    /// burst. The timer stops itself when `on_tick` returns `Break`.
    ///
    /// `on_exit` runs once when the task is finished or dropped, including
    /// when the runtime shuts down before the task was ever polled.
    pub(crate) fn spawn<F, G>(
        rt: &Handle,
        start: Instant,
        period: Duration,
        mut on_tick: F,
        on_exit: G,
    ) -> Self
    where
        F: FnMut(u64) -> ControlFlow<()> + Send + 'static,
        G: FnOnce() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));

        let task_running = Arc::clone(&running);
        let task_ticks = Arc::clone(&ticks);
        let guard = ExitGuard {
            running: Arc::clone(&running),
            on_exit: Some(on_exit),
        };

        let task = rt.spawn(async move {
            let _guard = guard;

            let Some(first_tick) = start.checked_add(period) else {
                // Period too large to ever fire
                return;
            };

            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if !task_running.load(Ordering::Acquire) {
                    break;
                }

                let tick = task_ticks.fetch_add(1, Ordering::AcqRel) + 1;
                if on_tick(tick).is_break() {
                    task_running.store(false, Ordering::Release);
                    break;
                }
            }
        });

        Self {
            running,
            ticks,
            abort: task.abort_handle(),
        }
    }

    /// Stop the timer
    ///
    /// Safe to call any number of times from any thread. Returns true only
    /// for the call that moved the timer from running to stopped.
    pub(crate) fn stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        self.abort.abort();
        was_running
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of ticks that invoked the callback
    pub(crate) fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
