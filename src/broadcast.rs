//! Generic single-writer fan-out.
//!
//! A [`Broadcaster`] is a handle to an actor task that owns the subscriber
//! set. Every operation is a message to that task, so subscriber bookkeeping
//! needs no locks.
//!
//! # Semantics
//!
//! - `publish` delivers the value to every current subscriber and returns once
//!   each has accepted it. Subscriber channels hold one value, so a subscriber
//!   that stops reading stalls publishing for everyone.
//! - `unsubscribe` keeps draining the subscriber's channel while the removal is
//!   in flight, so it cannot deadlock against a publish that is blocked on the
//!   very subscriber being removed.
//! - `kill` closes every subscriber and stops the actor. Later `subscribe` and
//!   `publish` calls return [`BroadcastError::Killed`].

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::BroadcastError;

enum BroadcastEvent<T> {
    Subscribe {
        reply_tx: oneshot::Sender<Subscriber<T>>,
    },
    Unsubscribe {
        id: u64,
        reply_tx: oneshot::Sender<()>,
    },
    Reset {
        reply_tx: oneshot::Sender<()>,
    },
    Publish {
        value: T,
        reply_tx: oneshot::Sender<()>,
    },
    Kill {
        reply_tx: oneshot::Sender<()>,
    },
}

/// Receiving end of one subscription.
#[derive(Debug)]
pub struct Subscriber<T> {
    id: u64,
    rx: mpsc::Receiver<T>,
}

impl<T> Subscriber<T> {
    /// Next published value, or `None` once the subscription is closed by
    /// `unsubscribe`, `reset` or `kill`.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// Handle to a fan-out actor. Cheap to clone; all clones share one subscriber set.
pub struct Broadcaster<T> {
    tx: mpsc::UnboundedSender<BroadcastEvent<T>>,
}

impl<T> std::fmt::Debug for Broadcaster<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Broadcaster<T> {
    /// Spawn the actor. Must be called from within a tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = BroadcastActor {
            subscribers: Vec::new(),
            next_id: 0,
        };
        tokio::spawn(actor.run(rx));
        Self { tx }
    }

    /// Add a subscriber. Fails once the broadcaster has been killed.
    pub async fn subscribe(&self) -> Result<Subscriber<T>, BroadcastError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BroadcastEvent::Subscribe { reply_tx })
            .map_err(|_| BroadcastError::Killed)?;
        reply_rx.await.map_err(|_| BroadcastError::Killed)
    }

    /// Remove and close one subscriber, discarding anything still in flight to it.
    pub async fn unsubscribe(&self, mut subscriber: Subscriber<T>) {
        let (reply_tx, mut reply_rx) = oneshot::channel();
        let event = BroadcastEvent::Unsubscribe {
            id: subscriber.id,
            reply_tx,
        };
        if self.tx.send(event).is_err() {
            return;
        }

        let mut draining = true;
        loop {
            tokio::select! {
                _ = &mut reply_rx => return,
                value = subscriber.rx.recv(), if draining => {
                    draining = value.is_some();
                }
            }
        }
    }

    /// Close and remove every subscriber. The broadcaster stays usable.
    pub async fn reset(&self) {
        self.request(|reply_tx| BroadcastEvent::Reset { reply_tx })
            .await;
    }

    /// Deliver `value` to every subscriber, waiting until each has accepted it.
    pub async fn publish(&self, value: T) -> Result<(), BroadcastError> {
        if self
            .request(|reply_tx| BroadcastEvent::Publish { value, reply_tx })
            .await
        {
            Ok(())
        } else {
            Err(BroadcastError::Killed)
        }
    }

    /// Close every subscriber and stop accepting new ones. Idempotent.
    pub async fn kill(&self) {
        self.request(|reply_tx| BroadcastEvent::Kill { reply_tx }).await;
    }

    /// Send an event and wait for its acknowledgement. False if the actor is gone.
    async fn request<F>(&self, event: F) -> bool
    where
        F: FnOnce(oneshot::Sender<()>) -> BroadcastEvent<T>,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(event(reply_tx)).is_err() {
            return false;
        }
        reply_rx.await.is_ok()
    }
}

struct BroadcastActor<T> {
    subscribers: Vec<(u64, mpsc::Sender<T>)>,
    next_id: u64,
}

impl<T: Clone + Send + 'static> BroadcastActor<T> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<BroadcastEvent<T>>) {
        while let Some(event) = rx.recv().await {
            match event {
                BroadcastEvent::Subscribe { reply_tx } => {
                    let (tx, sub_rx) = mpsc::channel(1);
                    let id = self.next_id;
                    self.next_id += 1;
                    self.subscribers.push((id, tx));
                    let _ = reply_tx.send(Subscriber { id, rx: sub_rx });
                }
                BroadcastEvent::Unsubscribe { id, reply_tx } => {
                    self.subscribers.retain(|(sub_id, _)| *sub_id != id);
                    let _ = reply_tx.send(());
                }
                BroadcastEvent::Reset { reply_tx } => {
                    self.subscribers.clear();
                    let _ = reply_tx.send(());
                }
                BroadcastEvent::Publish { value, reply_tx } => {
                    self.publish(value).await;
                    let _ = reply_tx.send(());
                }
                BroadcastEvent::Kill { reply_tx } => {
                    self.subscribers.clear();
                    let _ = reply_tx.send(());
                    break;
                }
            }
        }
        debug!("Broadcaster stopped");
    }

    async fn publish(&mut self, value: T) {
        let mut departed = Vec::new();
        for (id, tx) in &self.subscribers {
            // A dropped Subscriber reads as an implicit unsubscribe.
            if tx.send(value.clone()).await.is_err() {
                departed.push(*id);
            }
        }
        if !departed.is_empty() {
            self.subscribers.retain(|(id, _)| !departed.contains(id));
        }
    }
}
