//! Pending-request dispatch for a streaming connection.
//!
//! Watchers ask the [`Client`] for a future keyed by a message hash (for
//! example `"orderbook:BTC/USDT"`). The socket read loop hands every incoming
//! message to a handler, which updates books and caches and then resolves
//! the matching hash, waking every watcher waiting on it.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type Waiter<T> = oneshot::Sender<Result<T>>;

/// Registry of pending watchers, keyed by message hash.
#[derive(Debug)]
pub struct Client<T> {
    waiters: Mutex<HashMap<String, Vec<Waiter<T>>>>,
}

impl<T: Clone> Client<T> {
    pub fn new() -> Self {
        Client {
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a watcher for `message_hash` and returns the future it
    /// awaits. The watcher is registered before this returns, so a resolve
    /// issued before the first poll is not lost.
    ///
    /// Watchers whose futures were dropped are pruned here.
    pub fn future(&self, message_hash: impl Into<String>) -> impl Future<Output = Result<T>> {
        let (sender, receiver) = oneshot::channel();
        let mut waiters = self.waiters.lock();
        waiters.retain(|_, senders| {
            senders.retain(|sender| !sender.is_closed());
            !senders.is_empty()
        });
        waiters
            .entry(message_hash.into())
            .or_default()
            .push(sender);
        drop(waiters);

        async move { receiver.await.map_err(|_| Error::ConnectionClosed)? }
    }

    /// Resolves every watcher of `message_hash` with `value` and returns how
    /// many were still listening.
    pub fn resolve(&self, value: T, message_hash: &str) -> usize {
        let waiters = self.waiters.lock().remove(message_hash).unwrap_or_default();
        let delivered = waiters
            .into_iter()
            .filter_map(|waiter| waiter.send(Ok(value.clone())).ok())
            .count();
        debug!(message_hash, delivered, "resolved");
        delivered
    }

    /// Fails every watcher of `message_hash` with `error`.
    pub fn reject(&self, error: Error, message_hash: &str) -> usize {
        let waiters = self.waiters.lock().remove(message_hash).unwrap_or_default();
        warn!(message_hash, %error, waiters = waiters.len(), "rejecting watchers");
        waiters
            .into_iter()
            .filter_map(|waiter| waiter.send(Err(error.clone())).ok())
            .count()
    }

    /// Fails every pending watcher, whatever its hash.
    pub fn reject_all(&self, error: Error) -> usize {
        let pending: Vec<Waiter<T>> = self
            .waiters
            .lock()
            .drain()
            .flat_map(|(_, waiters)| waiters)
            .collect();
        if !pending.is_empty() {
            warn!(%error, waiters = pending.len(), "rejecting all watchers");
        }
        pending
            .into_iter()
            .filter_map(|waiter| waiter.send(Err(error.clone())).ok())
            .count()
    }

    /// Number of hashes with at least one pending watcher.
    pub fn pending(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Drives the read loop: each message from `messages` is passed to
    /// `handle`, which resolves or rejects watchers on this client. When the
    /// transport closes, every remaining watcher fails with
    /// [`Error::ConnectionClosed`].
    pub async fn run<M>(&self, mut messages: mpsc::Receiver<M>, mut handle: impl FnMut(&Self, M)) {
        while let Some(message) = messages.recv().await {
            handle(self, message);
        }
        debug!("transport closed");
        self.reject_all(Error::ConnectionClosed);
    }
}

impl<T: Clone> Default for Client<T> {
    fn default() -> Self {
        Self::new()
    }
}
