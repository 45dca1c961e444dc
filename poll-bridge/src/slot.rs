//! Single-assignment completion slot
//!
//! Several producers race to decide the outcome of one wait: the timer task
//! on an accepted tick, the caller when its deadline fires, and any cancel
//! handle. Whoever takes the sender first decides; everyone else gets `false`
//! and does nothing.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::Result;

pub(crate) struct CompletionSlot<T> {
    sender: Mutex<Option<oneshot::Sender<Result<T>>>>,
}

impl<T> CompletionSlot<T> {
    /// Create an empty slot and the receiver its outcome is delivered to
    pub(crate) fn new() -> (Arc<Self>, oneshot::Receiver<Result<T>>) {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Self {
            sender: Mutex::new(Some(tx)),
        });
        (slot, rx)
    }

    /// Deliver `outcome` if no other producer got here first
    ///
    /// Returns true if this call decided the outcome. Delivery to a receiver
    /// that was already dropped still counts as deciding.
    pub(crate) fn complete(&self, outcome: Result<T>) -> bool {
        let Some(sender) = self.sender.lock().take() else {
            return false;
        };
        let _ = sender.send(outcome);
        true
    }

    /// Claim the slot without delivering anything
    ///
    /// Used by the deadline path, which reports its outcome directly to the
    /// caller instead of through the channel.
    pub(crate) fn claim(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PollError;

    #[test]
    fn test_first_completion_wins() {
        let (slot, mut rx) = CompletionSlot::new();

        assert!(!slot.is_completed());
        assert!(slot.complete(Ok("first")));
        assert!(slot.is_completed());
        assert!(!slot.complete(Ok("second")));
        assert!(!slot.complete(Err(PollError::Cancelled)));

        assert_eq!(rx.try_recv().unwrap().unwrap(), "first");
    }

    #[test]
    fn test_claim_blocks_later_completion() {
        let (slot, mut rx) = CompletionSlot::<u32>::new();

        assert!(slot.claim());
        assert!(!slot.claim());
        assert!(!slot.complete(Ok(7)));

        // Sender was dropped by the claim, so nothing is ever delivered
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_complete_after_receiver_dropped() {
        let (slot, rx) = CompletionSlot::new();
        drop(rx);

        assert!(slot.complete(Ok(1)));
        assert!(!slot.complete(Ok(2)));
    }

    #[test]
    fn test_concurrent_producers_single_winner() {
        let (slot, mut rx) = CompletionSlot::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let slot = Arc::clone(&slot);
                std::thread::spawn(move || slot.complete(Ok(i)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(rx.try_recv().unwrap().is_ok());
    }
}
