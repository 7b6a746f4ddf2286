//! Cancellable tap-release timers keyed by button
//!
//! Every scheduled release runs as its own tokio task. When the delay
//! elapses the task does not touch controller state itself; it sends a
//! [`TimerFired`] message back to the owning session so the release is
//! processed in the same serialized stream as voice commands.
//!
//! ```text
//! schedule(A, 200ms) ──► task: sleep_until ──► TimerFired { A, gen } ──► session
//!        │                    ▲
//!  cancel(A) ── token ────────┘
//! ```
//!
//! Each entry carries a generation. A firing that was already queued when its
//! entry got cancelled or replaced no longer matches and is dropped by
//! [`ReleaseScheduler::take_fired`].

use crate::mapping::Button;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Message sent when a release timer elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub button: Button,
    pub generation: u64,
}

/// A scheduled future release
#[derive(Debug)]
pub struct PendingRelease {
    pub fire_at: Instant,
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug)]
pub struct ReleaseScheduler {
    pending: HashMap<Button, PendingRelease>,
    timer_tx: mpsc::Sender<TimerFired>,
    /// Parent of every timer token; cancelled on shutdown
    root: CancellationToken,
    next_generation: u64,
}

impl ReleaseScheduler {
    pub fn new(timer_tx: mpsc::Sender<TimerFired>) -> Self {
        Self {
            pending: HashMap::new(),
            timer_tx,
            root: CancellationToken::new(),
            next_generation: 0,
        }
    }

    /// Schedules a release for `button`, replacing any pending one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, button: Button, delay: Duration) -> Instant {
        self.cancel(button);

        self.next_generation += 1;
        let generation = self.next_generation;
        let fire_at = Instant::now() + delay;
        let token = self.root.child_token();

        let task_token = token.clone();
        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    debug!("Release timer for {} cancelled", button);
                }
                _ = tokio::time::sleep_until(fire_at) => {
                    if let Err(e) = timer_tx.send(TimerFired { button, generation }).await {
                        warn!("Release timer for {} fired but nobody is listening: {}", button, e);
                    }
                }
            }
        });

        debug!(
            "Scheduled release of {} in {}ms (generation {})",
            button,
            delay.as_millis(),
            generation
        );
        self.pending.insert(
            button,
            PendingRelease {
                fire_at,
                generation,
                token,
            },
        );
        fire_at
    }

    /// Cancels the pending release for `button`; returns whether one existed.
    pub fn cancel(&mut self, button: Button) -> bool {
        match self.pending.remove(&button) {
            Some(pending) => {
                pending.token.cancel();
                debug!(
                    "Cancelled pending release of {} (generation {})",
                    button, pending.generation
                );
                true
            }
            None => false,
        }
    }

    /// Cancels every pending release
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.root.cancel();
        self.pending.clear();
        // Fresh root so the scheduler stays usable
        self.root = CancellationToken::new();
        count
    }

    /// Claims a firing if it is still the current entry for its button.
    pub fn take_fired(&mut self, fired: &TimerFired) -> bool {
        match self.pending.get(&fired.button) {
            Some(pending) if pending.generation == fired.generation => {
                self.pending.remove(&fired.button);
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self, button: Button) -> bool {
        self.pending.contains_key(&button)
    }

    pub fn pending(&self, button: Button) -> Option<&PendingRelease> {
        self.pending.get(&button)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for ReleaseScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut scheduler = ReleaseScheduler::new(tx);
        let start = Instant::now();

        let fire_at = scheduler.schedule(Button::A, Duration::from_millis(200));
        assert_eq!(fire_at, start + Duration::from_millis(200));
        assert!(scheduler.is_pending(Button::A));

        let fired = rx.recv().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(fired.button, Button::A);
        assert!(scheduler.take_fired(&fired));
        assert!(!scheduler.is_pending(Button::A));
        // claimed once only
        assert!(!scheduler.take_fired(&fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut scheduler = ReleaseScheduler::new(tx);

        scheduler.schedule(Button::B, Duration::from_millis(100));
        assert!(scheduler.cancel(Button::B));
        assert!(!scheduler.cancel(Button::B));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_invalidates_old_generation() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut scheduler = ReleaseScheduler::new(tx);

        scheduler.schedule(Button::A, Duration::from_millis(100));
        let stale = TimerFired {
            button: Button::A,
            generation: scheduler.pending(Button::A).unwrap().generation,
        };
        scheduler.schedule(Button::A, Duration::from_millis(300));
        assert_eq!(scheduler.pending_count(), 1);
        assert!(!scheduler.take_fired(&stale));

        let fired = rx.recv().await.unwrap();
        assert_ne!(fired.generation, stale.generation);
        assert!(scheduler.take_fired(&fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut scheduler = ReleaseScheduler::new(tx);

        scheduler.schedule(Button::A, Duration::from_millis(100));
        scheduler.schedule(Button::X, Duration::from_millis(100));
        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());

        // still usable afterwards
        scheduler.schedule(Button::Y, Duration::from_millis(50));
        assert_eq!(rx.recv().await.unwrap().button, Button::Y);
    }
}
