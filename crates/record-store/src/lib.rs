//! Document store client for FieldTrack.
//!
//! This crate provides typed records for the five collections, equality-only
//! queries, cancellable live subscriptions and two [`DocumentStore`]
//! backends: an in-memory store for tests and tooling, and a SQLite cache
//! built on SQLx.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use record_store::{Collection, DocumentStore, Note, Query, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let store = SqliteStore::connect("sqlite:fieldtrack.db?mode=rwc").await?;
//!     store.migrate().await?;
//!
//!     // Watch one agent's notes
//!     let mut notes = store
//!         .subscribe(Query::new(Collection::Notes).where_eq("createdByUid", "u1"))
//!         .await;
//!     while let Some(snapshot) = notes.next().await {
//!         let notes: Vec<Note> = snapshot?.decode()?;
//!         println!("{} notes", notes.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod document;
pub mod error;
pub mod fields;
pub mod memory;
pub mod models;
pub mod query;
pub mod sqlite;
pub mod store;
pub mod subscription;
pub mod timestamp;
pub mod validation;

pub use document::{CollectionDocument, Document, Fields, RawDocument, Snapshot};
pub use error::{Result, StoreError};
pub use fields::RecordField;
pub use memory::MemoryStore;
pub use models::{
    Announcement, DirectMessage, FiberReady, InstallationRecord, JobStatus, Note, RecordSource,
    Role, UserProfile, VALID_TEAMS,
};
pub use query::{Collection, Filter, FilterValue, Query};
pub use sqlite::SqliteStore;
pub use store::{fetch_typed, get_typed, DocumentStore};
pub use subscription::{Subscription, SubscriptionSink};
pub use validation::{ContactRule, ValidationError};
