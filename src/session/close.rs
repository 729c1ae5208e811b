//! One-shot close signal shared by a session's inbound and outbound loops.
//!
//! Either loop (or the owner of a clone) may trigger it any number of times.
//! Exactly one of those calls observes `true`; every waiter on `cancelled`
//! wakes up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

#[derive(Debug, Clone, Default)]
pub struct CloseSignal {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl CloseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `true` only for the first caller.
    pub fn trigger(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::SeqCst);
        self.token.cancel();
        first
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_first_trigger_wins() {
        let signal = CloseSignal::new();
        let other = signal.clone();
        assert!(!signal.is_closed());
        assert!(other.trigger());
        assert!(!signal.trigger());
        assert!(!other.trigger());
        assert!(signal.is_closed());
    }

    #[tokio::test]
    async fn test_waiters_wake_on_trigger() {
        let signal = CloseSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };
        signal.trigger();
        waiter.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_triggers_fire_once() {
        let signal = CloseSignal::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.trigger() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
