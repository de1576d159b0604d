//! Cancellable live subscriptions.
//!
//! A live query is a channel pair. The store keeps the [`SubscriptionSink`]
//! and pushes a full [`Snapshot`] after every write that touches the queried
//! collection; the caller holds the [`Subscription`] and reads it as a
//! `Stream`. Cancelling (or dropping) the subscription flips a shared flag
//! that both ends check, so nothing produced after cancellation is observed.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::document::{RawDocument, Snapshot};
use crate::error::{Result, StoreError};
use crate::query::{Collection, Query};

#[derive(Debug, Default)]
struct Shared {
    closed: AtomicBool,
    sequence: AtomicU64,
}

/// Create a connected sink/subscription pair for `query`.
pub fn channel(query: Query) -> (SubscriptionSink, Subscription) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared::default());
    let sink = SubscriptionSink {
        query: query.clone(),
        tx,
        shared: Arc::clone(&shared),
    };
    let subscription = Subscription { query, rx, shared };
    (sink, subscription)
}

/// Consumer half of a live query.
///
/// Yields snapshots in arrival order, or errors reported by the store.
/// Ends once cancelled, dropped by the store, or after the sink is gone.
#[derive(Debug)]
pub struct Subscription {
    query: Query,
    rx: mpsc::UnboundedReceiver<Result<Snapshot>>,
    shared: Arc<Shared>,
}

impl Subscription {
    /// The query this subscription listens to.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Stop listening. Buffered and future events are discarded.
    pub fn cancel(&mut self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            debug!(query = %self.query, "Subscription cancelled");
        }
        self.rx.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl Stream for Subscription {
    type Item = Result<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_closed() {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            // Cancelled between send and receive.
            Poll::Ready(Some(_)) if self.is_closed() => Poll::Ready(None),
            other => other,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }
}

/// Producer half of a live query, held by the store.
#[derive(Debug, Clone)]
pub struct SubscriptionSink {
    query: Query,
    tx: mpsc::UnboundedSender<Result<Snapshot>>,
    shared: Arc<Shared>,
}

impl SubscriptionSink {
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }

    /// Push a full result set. Returns `false` if the subscription is closed.
    pub fn deliver(&self, docs: Vec<RawDocument>) -> bool {
        if self.is_closed() {
            return false;
        }
        let sequence = self.shared.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(query = %self.query, sequence, count = docs.len(), "Delivering snapshot");
        self.tx.send(Ok(Snapshot { sequence, docs })).is_ok()
    }

    /// Push an error. Returns `false` if the subscription is closed.
    pub fn fail(&self, err: StoreError) -> bool {
        if self.is_closed() {
            return false;
        }
        self.tx.send(Err(err)).is_ok()
    }
}

/// Live subscriptions registered with a store.
#[derive(Debug, Default)]
pub struct LiveRegistry {
    sinks: Mutex<Vec<SubscriptionSink>>,
}

impl LiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: SubscriptionSink) {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    /// Open sinks listening on `collection`. Closed sinks are dropped.
    pub fn interested(&self, collection: Collection) -> Vec<SubscriptionSink> {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.retain(|s| !s.is_closed());
        sinks
            .iter()
            .filter(|s| s.query.collection == collection)
            .cloned()
            .collect()
    }

    /// Every open sink.
    pub fn all(&self) -> Vec<SubscriptionSink> {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.retain(|s| !s.is_closed());
        sinks.clone()
    }

    /// Number of open subscriptions.
    pub fn len(&self) -> usize {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.retain(|s| !s.is_closed());
        sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
