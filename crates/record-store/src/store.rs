//! The document store seam.

use async_trait::async_trait;

use crate::document::{CollectionDocument, Fields, RawDocument};
use crate::error::Result;
use crate::query::{Collection, Query};
use crate::subscription::Subscription;

/// A document database with equality queries and live subscriptions.
///
/// Implementations echo every successful write to matching live
/// subscriptions before the write call returns.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Open a live query. The first snapshot is delivered immediately.
    ///
    /// Access errors are reported through the returned stream, not here, so
    /// every subscription failure reaches the same handler.
    async fn subscribe(&self, query: Query) -> Subscription;

    /// One-shot query.
    async fn fetch(&self, query: &Query) -> Result<Vec<RawDocument>>;

    /// Read one document by id.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RawDocument>>;

    /// Insert a document under a generated id and return the id.
    async fn add(&self, collection: Collection, fields: Fields) -> Result<String>;

    /// Create or replace a document under a caller-chosen id.
    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> Result<()>;

    /// Merge `fields` into an existing document.
    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<()>;

    /// Remove a document.
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;
}

/// Read and decode one typed document.
pub async fn get_typed<T: CollectionDocument>(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<Option<T>> {
    match store.get(T::COLLECTION, id).await? {
        Some(raw) => T::decode(&raw).map(Some),
        None => Ok(None),
    }
}

/// Run a one-shot query and decode the results.
pub async fn fetch_typed<T: CollectionDocument>(
    store: &dyn DocumentStore,
    query: &Query,
) -> Result<Vec<T>> {
    store
        .fetch(query)
        .await?
        .iter()
        .map(T::decode)
        .collect()
}
