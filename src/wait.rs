//! Transient, filtered subscriptions to inbound frames.
//!
//! A pending wait is registered before its triggering action runs, so the
//! frame that action provokes can never slip past it. Every inbound frame is
//! pushed to every pending wait; the waiting side applies its own filter.
//!
//! Cleanup lives in [`PendingWait`]'s `Drop`: a wait that matched, saw the
//! connection close, timed out, or whose future was simply dropped always
//! leaves the table and discards anything still queued for it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::frame::Frame;

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The filter accepted this frame.
    Matched(Arc<Frame>),
    /// The connection went away (or was never up) before a match.
    Closed,
    /// The caller's deadline passed before a match.
    TimedOut,
}

impl WaitOutcome {
    /// Whether the filter matched.
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// Table of pending waits for one connection.
#[derive(Debug, Default)]
pub struct WaitRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, mpsc::UnboundedSender<Arc<Frame>>>>,
}

impl WaitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending wait.
    pub(crate) fn register(&self) -> PendingWait<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending.lock().insert(id, tx);
        PendingWait {
            id,
            rx,
            registry: self,
        }
    }

    /// Deliver a frame to every pending wait.
    pub(crate) fn broadcast(&self, frame: &Arc<Frame>) {
        let pending = self.pending.lock();
        for tx in pending.values() {
            // A closed receiver is already on its way out of the table.
            let _ = tx.send(Arc::clone(frame));
        }
    }

    /// Close every pending wait's channel. Waiters see [`WaitOutcome::Closed`]
    /// once they have consumed whatever was already queued.
    pub(crate) fn close_all(&self) {
        self.pending.lock().clear();
    }

    fn remove(&self, id: u64) {
        self.pending.lock().remove(&id);
    }

    /// Number of waits currently registered.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A registered wait; receives every inbound frame until dropped.
pub(crate) struct PendingWait<'a> {
    id: u64,
    rx: mpsc::UnboundedReceiver<Arc<Frame>>,
    registry: &'a WaitRegistry,
}

impl PendingWait<'_> {
    /// Receive frames until `filter` accepts one or the channel closes.
    pub(crate) async fn until<F>(&mut self, mut filter: F) -> WaitOutcome
    where
        F: FnMut(&Frame) -> bool,
    {
        while let Some(frame) = self.rx.recv().await {
            if filter(&frame) {
                return WaitOutcome::Matched(frame);
            }
        }
        WaitOutcome::Closed
    }
}

impl Drop for PendingWait<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slirc_proto::Message;
    use std::time::Duration;

    fn frame(raw: &str) -> Arc<Frame> {
        Arc::new(Frame::new(raw.parse::<Message>().unwrap()))
    }

    #[tokio::test]
    async fn test_every_wait_sees_every_frame() {
        let registry = WaitRegistry::new();
        let mut a = registry.register();
        let mut b = registry.register();
        assert_eq!(registry.len(), 2);

        registry.broadcast(&frame("NOTICE me :one"));
        registry.broadcast(&frame("NOTICE me :two"));

        let got_a = a.until(|f| f.trailing_text() == "two").await;
        let got_b = b.until(|f| f.trailing_text() == "one").await;
        assert!(got_a.is_matched());
        assert!(got_b.is_matched());
    }

    #[tokio::test]
    async fn test_drop_deregisters() {
        let registry = WaitRegistry::new();
        {
            let _wait = registry.register();
            registry.broadcast(&frame("PING :x"));
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
        // Broadcasting with nobody listening is a no-op.
        registry.broadcast(&frame("PING :y"));
    }

    #[tokio::test]
    async fn test_close_all_ends_waits() {
        let registry = Arc::new(WaitRegistry::new());
        let mut waits: Vec<_> = (0..8).map(|_| registry.register()).collect();
        registry.close_all();
        for wait in waits.iter_mut() {
            assert_eq!(wait.until(|_| false).await, WaitOutcome::Closed);
        }
    }

    #[tokio::test]
    async fn test_queued_frames_delivered_before_close() {
        let registry = WaitRegistry::new();
        let mut wait = registry.register();
        registry.broadcast(&frame("NOTICE me :has been ghosted"));
        registry.close_all();

        let outcome = wait.until(|f| f.trailing_text().contains("ghosted")).await;
        assert!(outcome.is_matched());
    }

    #[tokio::test]
    async fn test_timeout_drops_registration() {
        let registry = WaitRegistry::new();
        let result = tokio::time::timeout(Duration::from_millis(10), async {
            let mut wait = registry.register();
            wait.until(|_| false).await
        })
        .await;
        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
