//! In-memory document store.
//!
//! Used by tests and the CLI. Collections keep insertion order. Fault
//! injection hooks simulate backend denials and network failures.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::{Fields, RawDocument};
use crate::error::{Result, StoreError};
use crate::query::{Collection, Query};
use crate::store::DocumentStore;
use crate::subscription::{self, LiveRegistry, Subscription};

#[derive(Debug, Default)]
struct State {
    collections: HashMap<Collection, IndexMap<String, Fields>>,
    denied: HashSet<Collection>,
    fail_next_write: Option<String>,
}

impl State {
    fn check_access(&self, operation: &'static str, collection: Collection) -> Result<()> {
        if self.denied.contains(&collection) {
            return Err(StoreError::PermissionDenied {
                operation,
                collection,
            });
        }
        Ok(())
    }

    fn check_write(&mut self, operation: &'static str, collection: Collection) -> Result<()> {
        self.check_access(operation, collection)?;
        if let Some(reason) = self.fail_next_write.take() {
            return Err(StoreError::Unavailable(reason));
        }
        Ok(())
    }

    fn query(&self, query: &Query) -> Vec<RawDocument> {
        match self.collections.get(&query.collection) {
            Some(docs) => query.apply(docs.iter()),
            None => Vec::new(),
        }
    }
}

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    live: LiveRegistry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `collection` fail with `PermissionDenied`.
    ///
    /// Open subscriptions on the collection receive the error.
    pub async fn deny(&self, collection: Collection) {
        self.state.lock().await.denied.insert(collection);
        for sink in self.live.interested(collection) {
            sink.fail(StoreError::PermissionDenied {
                operation: "subscribe",
                collection,
            });
        }
    }

    /// Lift a previous [`deny`](Self::deny).
    pub async fn allow(&self, collection: Collection) {
        self.state.lock().await.denied.remove(&collection);
    }

    /// Fail the next write with `Unavailable`.
    pub async fn fail_next_write(&self, reason: impl Into<String>) {
        self.state.lock().await.fail_next_write = Some(reason.into());
    }

    /// Report an error to every open subscription on `collection`.
    pub fn push_error(&self, collection: Collection, err: StoreError) {
        for sink in self.live.interested(collection) {
            sink.fail(err.duplicate());
        }
    }

    /// Number of subscriptions still open.
    pub fn active_subscriptions(&self) -> usize {
        self.live.len()
    }

    /// Every document in a collection, in insertion order.
    pub async fn documents(&self, collection: Collection) -> Vec<RawDocument> {
        self.state
            .lock()
            .await
            .query(&Query::new(collection))
    }

    /// Push fresh results to every live query on `collection`.
    ///
    /// Runs with the state lock held, so snapshots leave in the same order
    /// as the writes they reflect.
    fn broadcast(&self, state: &State, collection: Collection) {
        for sink in self.live.interested(collection) {
            let docs = state.query(sink.query());
            sink.deliver(docs);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn subscribe(&self, query: Query) -> Subscription {
        let (sink, subscription) = subscription::channel(query);
        let state = self.state.lock().await;
        match state.check_access("subscribe", sink.query().collection) {
            Ok(()) => {
                debug!(query = %sink.query(), "Opened live query");
                // Registered under the lock, before any later write can broadcast.
                sink.deliver(state.query(sink.query()));
                self.live.register(sink);
            }
            Err(err) => {
                warn!(query = %sink.query(), error = %err, "Live query rejected");
                sink.fail(err);
            }
        }
        subscription
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<RawDocument>> {
        let state = self.state.lock().await;
        state.check_access("fetch", query.collection)?;
        Ok(state.query(query))
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RawDocument>> {
        let state = self.state.lock().await;
        state.check_access("get", collection)?;
        Ok(state
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| RawDocument::new(id, fields.clone())))
    }

    async fn add(&self, collection: Collection, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut state = self.state.lock().await;
        state.check_write("add", collection)?;
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        debug!(%collection, %id, "Added document");
        self.broadcast(&state, collection);
        Ok(id)
    }

    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_write("set", collection)?;
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), fields);
        debug!(%collection, %id, "Set document");
        self.broadcast(&state, collection);
        Ok(())
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_write("update", collection)?;
        let existing = state
            .collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        for (key, value) in fields {
            existing.insert(key, value);
        }
        debug!(%collection, %id, "Updated document");
        self.broadcast(&state, collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_write("delete", collection)?;
        state
            .collections
            .get_mut(&collection)
            .and_then(|docs| docs.shift_remove(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        debug!(%collection, %id, "Deleted document");
        self.broadcast(&state, collection);
        Ok(())
    }
}
