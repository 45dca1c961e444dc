//! BlockingPoller - synchronous entry points for the bridge
//!
//! The foreign runtime on the other side of the shim calls in synchronously
//! and cannot hold a Rust future. `BlockingPoller` drives the async bridge on
//! a Tokio runtime and blocks the calling thread until the outcome is known.
//!
//! Only multi-thread runtimes are accepted. A current-thread runtime runs its
//! timers only while its own thread drives it, so a `block_on` issued through
//! its handle from elsewhere would never see a tick or a deadline.

use std::time::Duration;

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::bridge;
use crate::error::{PollError, ProbeError, Result};

/// Blocking wrapper around the polling bridge
///
/// # Example
///
/// ```rust,ignore
/// let rt = tokio::runtime::Runtime::new()?;
/// let poller = BlockingPoller::new(rt.handle().clone())?;
///
/// // Blocks until the camera reports it is connected, or 5 seconds pass
/// let connected = poller.await_for_true(
///     camera,
///     Duration::from_millis(100),
///     Duration::from_secs(5),
///     |camera| camera.is_connected(),
/// )?;
/// ```
///
/// Calls panic if made from inside an async context, the same as
/// [`Handle::block_on`].
#[derive(Debug, Clone)]
pub struct BlockingPoller {
    rt: Handle,
}

impl BlockingPoller {
    /// Create a poller that drives waits on `rt`
    ///
    /// Fails with [`PollError::NoRuntime`] if `rt` belongs to a
    /// current-thread runtime.
    pub fn new(rt: Handle) -> Result<Self> {
        if rt.runtime_flavor() == RuntimeFlavor::CurrentThread {
            return Err(PollError::NoRuntime(
                "blocking waits need a multi-thread runtime; a current-thread runtime \
                 does not run its timers for callers outside it"
                    .to_string(),
            ));
        }
        Ok(Self { rt })
    }

    /// Create a poller on the runtime the current thread is entered into
    pub fn current() -> Result<Self> {
        let rt = Handle::try_current().map_err(|e| PollError::NoRuntime(e.to_string()))?;
        Self::new(rt)
    }

    /// Blocking version of [`bridge::await_until`]
    pub fn await_until<S, T, P, F>(
        &self,
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
        self.rt.block_on(bridge::await_until(
            subject,
            poll_interval,
            timeout,
            probe,
            predicate,
        ))
    }

    /// Blocking version of [`bridge::try_await_until`]
    pub fn try_await_until<S, T, E, P, F>(
        &self,
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
        self.rt.block_on(bridge::try_await_until(
            subject,
            poll_interval,
            timeout,
            probe,
            predicate,
        ))
    }

    /// Blocking version of [`bridge::await_for_some`]
    pub fn await_for_some<S, T, P>(
        &self,
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
        self.rt
            .block_on(bridge::await_for_some(subject, poll_interval, timeout, probe))
    }

    /// Blocking version of [`bridge::await_for_true`]
    pub fn await_for_true<S, P>(
        &self,
        subject: S,
        poll_interval: Duration,
        timeout: Duration,
        probe: P,
    ) -> Result<bool>
    where
        S: Send + 'static,
        P: FnMut(&S) -> bool + Send + 'static,
    {
        self.rt
            .block_on(bridge::await_for_true(subject, poll_interval, timeout, probe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_blocking_await_for_true() {
        // Create a runtime for this test (can't use tokio::test with block_on)
        let rt = tokio::runtime::Runtime::new().unwrap();
        let poller = BlockingPoller::new(rt.handle().clone()).unwrap();

        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = poller.await_for_true(
            (),
            Duration::from_millis(5),
            Duration::from_secs(2),
            move |_| counter.fetch_add(1, Ordering::SeqCst) + 1 >= 2,
        );

        assert!(result.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_blocking_timeout() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let poller = BlockingPoller::new(rt.handle().clone()).unwrap();

        let result = poller.await_for_some(
            (),
            Duration::from_millis(200),
            Duration::from_millis(20),
            |_| Some(1),
        );

        assert!(result.unwrap_err().is_timeout());
    }

    #[test]
    fn test_blocking_probe_error() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let poller = BlockingPoller::new(rt.handle().clone()).unwrap();

        let result = poller.try_await_until(
            "camera-1",
            Duration::from_millis(5),
            Duration::from_secs(2),
            |_| Err::<bool, _>("not connected"),
            |ready| *ready,
        );

        assert!(result.unwrap_err().is_probe_failure());
    }

    #[test]
    fn test_current_without_runtime() {
        assert!(matches!(
            BlockingPoller::current(),
            Err(PollError::NoRuntime(_))
        ));
    }

    #[test]
    fn test_current_inside_entered_runtime() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();

        let poller = BlockingPoller::current().unwrap();
        let value = poller
            .await_until((), Duration::from_millis(5), Duration::from_secs(2), |_| 7, |v| *v == 7)
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_current_thread_runtime_is_rejected() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let result = BlockingPoller::new(rt.handle().clone());
        assert!(matches!(result, Err(PollError::NoRuntime(_))));

        let _guard = rt.enter();
        assert!(matches!(
            BlockingPoller::current(),
            Err(PollError::NoRuntime(_))
        ));
    }

    #[test]
    fn test_finite_timeout_returns_from_another_thread() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let poller = BlockingPoller::new(rt.handle().clone()).unwrap();

        let started = std::time::Instant::now();
        let result = std::thread::spawn(move || {
            poller.await_for_true((), Duration::from_millis(10), Duration::from_millis(50), |_| {
                false
            })
        })
        .join()
        .unwrap();

        assert!(result.unwrap_err().is_timeout());
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
