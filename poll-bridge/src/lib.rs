//! # poll-bridge
//!
//! Await a condition that can only be discovered by polling.
//!
//! The camera shim exposes an SDK whose state changes arrive through
//! observers and delegates. The runtime on the other side of the shim cannot
//! register closures, so instead it asks "wait until this property reads
//! back as X". This crate answers that question: it probes a subject on a
//! fixed interval, and resolves a single future the first time a predicate
//! accepts the probe's result, or fails with a timeout.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> poll_bridge::Result<()> {
//! // Subject: a frame counter the probe reads (and here, bumps)
//! let frames = AtomicU32::new(0);
//!
//! let ready = poll_bridge::await_for_true(
//!     frames,
//!     Duration::from_millis(5),
//!     Duration::from_secs(1),
//!     |frames| frames.fetch_add(1, Ordering::SeqCst) + 1 >= 3,
//! )
//! .await?;
//!
//! assert!(ready);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! PollBridge<T>
//!     │
//!     ├── PollTimer ── tokio task: interval_at(start + interval, interval)
//!     │                   └── tick → probe(&subject) → predicate(&result)
//!     │
//!     ├── CompletionSlot<T> ── first producer wins
//!     │       ▲      ▲      ▲
//!     │   accepted  deadline  CancelHandle
//!     │     tick
//!     │
//!     └── oneshot::Receiver ── awaited by PollBridge::wait
//! ```

pub mod blocking;
pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod predicate;

mod slot;
mod timer;

pub use blocking::BlockingPoller;
pub use bridge::{
    await_for_some, await_for_true, await_until, try_await_until, BridgeId, CancelHandle,
    PollBridge, PollStats,
};
pub use config::PollConfig;
pub use error::{PollError, ProbeError, Result};
pub use logging::{init_logging, LoggingMode};
