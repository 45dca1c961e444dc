//! Polling-to-future bridge
//!
//! Turns "keep checking until this becomes true" into a single awaitable
//! result. A [`PollBridge`] owns one recurring timer that invokes a probe
//! against a fixed subject; the first probe result accepted by the predicate
//! resolves the wait. A wall-clock deadline measured from creation races the
//! timer, and whichever reaches the completion slot first decides the
//! outcome.
//!
//! The free functions [`await_until`], [`await_for_some`], [`await_for_true`]
//! and [`try_await_until`] cover the common case of starting a bridge and
//! awaiting it immediately.
//!
//! # Timing
//!
//! The first probe runs one full poll interval after creation. There is no
//! check at t=0. Consecutive probes are spaced by at least the poll interval
//! and never overlap.
//!
//! # Probe failures
//!
//! A probe that returns `Err` (fallible entry points) or panics ends the wait
//! immediately with [`PollError::ProbeFailed`] or [`PollError::ProbePanicked`].
//! Failures are not retried on the next tick.
//!
//! Probes run on a runtime worker thread and should return quickly; a probe
//! that blocks holds up that worker (and delays its own next tick).

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

use crate::config::PollConfig;
use crate::error::{PollError, ProbeError, Result};
use crate::predicate;
use crate::slot::CompletionSlot;
use crate::timer::PollTimer;

static NEXT_BRIDGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for a bridge, used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BridgeId(u64);

impl BridgeId {
    fn next() -> Self {
        Self(NEXT_BRIDGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bridge-{}", self.0)
    }
}

/// State shared between the bridge, its timer task and cancel handles
struct Shared<T> {
    slot: Arc<CompletionSlot<T>>,
    timer: PollTimer,
}

trait Cancel: Send + Sync {
    fn cancel(&self) -> bool;
}

impl<T: Send> Cancel for Shared<T> {
    fn cancel(&self) -> bool {
        let decided = self.slot.complete(Err(PollError::Cancelled));
        self.timer.stop();
        decided
    }
}

/// Cancels a pending wait from outside the awaiting task
///
/// Cloneable and type-erased so it can be handed to code that knows nothing
/// about the bridge's result type.
#[derive(Clone)]
pub struct CancelHandle {
    id: BridgeId,
    inner: Arc<dyn Cancel>,
}

impl CancelHandle {
    /// Resolve the wait with [`PollError::Cancelled`] and stop the timer
    ///
    /// Returns true if this call decided the outcome, false if the wait had
    /// already resolved (or been cancelled) by then.
    pub fn cancel(&self) -> bool {
        let decided = self.inner.cancel();
        if decided {
            debug!(bridge = %self.id, "wait cancelled");
        }
        decided
    }

    /// The bridge this handle cancels
    pub fn bridge_id(&self) -> BridgeId {
        self.id
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle").field("id", &self.id).finish()
    }
}

/// Snapshot of a bridge's progress
#[derive(Debug, Clone)]
pub struct PollStats {
    pub id: BridgeId,
    pub ticks: u64,
    pub elapsed: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub is_running: bool,
}

impl fmt::Display for PollStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ticks in {:?} (interval: {:?}, timeout: {:?}, running: {})",
            self.id, self.ticks, self.elapsed, self.poll_interval, self.timeout, self.is_running
        )
    }
}

/// A pending wait on a polled condition
///
/// Created with [`PollBridge::start`] or [`PollBridge::start_fallible`], which
/// immediately schedule the probe. Await the outcome with
/// [`wait`](PollBridge::wait). Dropping the bridge stops its timer.
pub struct PollBridge<T> {
    id: BridgeId,
    config: PollConfig,
    started_at: Instant,
    /// `None` when the timeout is too large to represent as an instant
    deadline: Option<Instant>,
    shared: Arc<Shared<T>>,
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T: Send + 'static> PollBridge<T> {
    /// Start polling `probe(&subject)` until `predicate` accepts a result
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<S, P, F>(subject: S, config: PollConfig, mut probe: P, predicate: F) -> Result<Self>
    where
        S: Send + 'static,
        P: FnMut(&S) -> T + Send + 'static,
        F: Fn(&T) -> bool + Send + 'static,
    {
        Self::start_fallible(
            subject,
            config,
            move |subject: &S| Ok::<T, Infallible>(probe(subject)),
            predicate,
        )
    }

    /// Start polling a probe that can fail
    ///
    /// The first `Err` returned by the probe ends the wait with
    /// [`PollError::ProbeFailed`].
    pub fn start_fallible<S, E, P, F>(
        subject: S,
        config: PollConfig,
        mut probe: P,
        predicate: F,
    ) -> Result<Self>
    where
        S: Send + 'static,
        E: Into<ProbeError>,
        P: FnMut(&S) -> std::result::Result<T, E> + Send + 'static,
        F: Fn(&T) -> bool + Send + 'static,
    {
        config.validate()?;
        let rt = Handle::try_current().map_err(|e| PollError::NoRuntime(e.to_string()))?;

        let id = BridgeId::next();
        let started_at = Instant::now();
        if started_at.checked_add(config.poll_interval).is_none() {
            return Err(PollError::InvalidConfig(format!(
                "poll_interval {:?} is too large to schedule",
                config.poll_interval
            )));
        }
        let deadline = started_at.checked_add(config.timeout);
        let (slot, receiver) = CompletionSlot::new();

        let tick_slot = Arc::clone(&slot);
        let exit_slot = Arc::clone(&slot);
        let on_tick = move |tick: u64| {
            let checked = panic::catch_unwind(AssertUnwindSafe(|| {
                probe(&subject).map(|value| predicate(&value).then_some(value))
            }));

            let outcome = match checked {
                Ok(Ok(Some(value))) => Ok(value),
                Ok(Ok(None)) => {
                    trace!(bridge = %id, tick, "condition not met");
                    return ControlFlow::Continue(());
                }
                Ok(Err(e)) => {
                    let source: ProbeError = e.into();
                    warn!(bridge = %id, tick, error = %source, "probe failed");
                    Err(PollError::ProbeFailed { tick, source })
                }
                Err(payload) => {
                    let message = panic_message(&*payload);
                    warn!(bridge = %id, tick, panic = %message, "probe panicked");
                    Err(PollError::ProbePanicked { tick, message })
                }
            };

            if tick_slot.complete(outcome) {
                debug!(bridge = %id, tick, "wait resolved by probe");
            } else {
                trace!(bridge = %id, tick, "late tick discarded");
            }
            ControlFlow::Break(())
        };
        // Fires on every task exit; a no-op unless nothing decided the outcome
        let on_exit = move || {
            if exit_slot.complete(Err(PollError::Stopped)) {
                debug!(bridge = %id, "timer ended without an outcome");
            }
        };
        let timer = PollTimer::spawn(&rt, started_at, config.poll_interval, on_tick, on_exit);

        debug!(
            bridge = %id,
            poll_interval = ?config.poll_interval,
            timeout = ?config.timeout,
            "polling started"
        );

        Ok(Self {
            id,
            config,
            started_at,
            deadline,
            shared: Arc::new(Shared { slot, timer }),
            receiver,
        })
    }

    /// Wait for the outcome
    ///
    /// Resolves exactly once: with the first accepted probe result, or with
    /// the first failure (timeout, probe failure, cancellation). If the timer
    /// task dies first, for example because its runtime shut down, the wait
    /// ends with [`PollError::Stopped`]. The timer is stopped before this
    /// returns.
    pub async fn wait(mut self) -> Result<T> {
        let received = match self.deadline {
            Some(deadline) => match time::timeout_at(deadline, &mut self.receiver).await {
                Ok(received) => received,
                Err(_) => {
                    if self.shared.slot.claim() {
                        self.shared.timer.stop();
                        let elapsed = self.started_at.elapsed();
                        debug!(
                            bridge = %self.id,
                            ?elapsed,
                            ticks = self.shared.timer.ticks(),
                            "wait timed out"
                        );
                        return Err(PollError::Timeout { elapsed });
                    }
                    // Lost the race; the winner's outcome is already in flight
                    (&mut self.receiver).await
                }
            },
            None => (&mut self.receiver).await,
        };

        self.shared.timer.stop();
        received.unwrap_or_else(|_| Err(PollError::Stopped))
    }
}

impl<T> PollBridge<T> {
    pub fn id(&self) -> BridgeId {
        self.id
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Whether the timer is still scheduling probes
    pub fn is_running(&self) -> bool {
        self.shared.timer.is_running()
    }

    /// Whether some producer has already decided the outcome
    pub fn is_resolved(&self) -> bool {
        self.shared.slot.is_completed()
    }

    pub fn stats(&self) -> PollStats {
        PollStats {
            id: self.id,
            ticks: self.shared.timer.ticks(),
            elapsed: self.started_at.elapsed(),
            poll_interval: self.config.poll_interval,
            timeout: self.config.timeout,
            is_running: self.is_running(),
        }
    }
}

impl<T: Send + 'static> PollBridge<T> {
    /// Get a handle that can cancel this wait from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            id: self.id,
            inner: Arc::clone(&self.shared) as Arc<dyn Cancel>,
        }
    }
}

impl<T> Drop for PollBridge<T> {
    fn drop(&mut self) {
        if self.shared.timer.stop() {
            trace!(bridge = %self.id, "bridge dropped while polling");
        }
    }
}

impl<T> fmt::Debug for PollBridge<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollBridge")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("is_running", &self.is_running())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Wait until `predicate` accepts `probe(&subject)`
pub async fn await_until<S, T, P, F>(
    subject: S,
    poll_interval: Duration,
    timeout: Duration,
    probe: P,
    predicate: F,
) -> Result<T>
where
    S: Send + 'static,
    T: Send + 'static,
    P: FnMut(&S) -> T + Send + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    let config = PollConfig {
        poll_interval,
        timeout,
    };
    PollBridge::start(subject, config, probe, predicate)?.wait().await
}

/// Like [`await_until`], for probes that can fail
pub async fn try_await_until<S, T, E, P, F>(
    subject: S,
    poll_interval: Duration,
    timeout: Duration,
    probe: P,
    predicate: F,
) -> Result<T>
where
    S: Send + 'static,
    T: Send + 'static,
    E: Into<ProbeError>,
    P: FnMut(&S) -> std::result::Result<T, E> + Send + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    let config = PollConfig {
        poll_interval,
        timeout,
    };
    PollBridge::start_fallible(subject, config, probe, predicate)?
        .wait()
        .await
}

/// Wait until `probe(&subject)` returns a value, then yield it
pub async fn await_for_some<S, T, P>(
    subject: S,
    poll_interval: Duration,
    timeout: Duration,
    probe: P,
) -> Result<T>
where
    S: Send + 'static,
    T: Send + 'static,
    P: FnMut(&S) -> Option<T> + Send + 'static,
{
    match await_until(subject, poll_interval, timeout, probe, predicate::is_some).await? {
        Some(value) => Ok(value),
        None => unreachable!("is_some accepted an absent value"),
    }
}

/// Wait until `probe(&subject)` returns `true`
pub async fn await_for_true<S, P>(
    subject: S,
    poll_interval: Duration,
    timeout: Duration,
    probe: P,
) -> Result<bool>
where
    S: Send + 'static,
    P: FnMut(&S) -> bool + Send + 'static,
{
    await_until(subject, poll_interval, timeout, probe, predicate::is_true).await
}
