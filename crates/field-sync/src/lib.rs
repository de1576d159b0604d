//! Live sync, session routing and write actions for FieldTrack.
//!
//! This crate connects a [`DocumentStore`](record_store::DocumentStore) to
//! the pure view layer in `field-view`:
//!
//! - [`Session`] follows the signed-in identity, loads the profile, routes
//!   supervisors and agents to their view and applies live snapshots
//! - [`LiveQueries`] keeps exactly one subscription per slot and tears all
//!   of them down on every navigation
//! - [`ActionDispatcher`] validates and performs writes; their effects come
//!   back through the live queries, never directly
//!
//! # Architecture
//!
//! ```text
//!  IdentityProvider ──watch──┐
//!                            ▼
//!                 ┌─────────────────────┐
//!                 │       Session       │
//!                 │  route → plan_for   │
//!                 │         ↓           │
//!                 │  LiveQueries (map   │◀── snapshots ── DocumentStore
//!                 │  of slot streams)   │                      ▲
//!                 │         ↓           │                      │
//!                 │  ViewModel.apply    │                      │
//!                 └─────────┬───────────┘                      │
//!                           ▼                                  │
//!                    render(now)          ActionDispatcher ── writes
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use field_sync::{IdentityProvider, LocalIdentityProvider, Session, SyncConfig, SystemClock};
//! use record_store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::new());
//!     let identity = LocalIdentityProvider::new();
//!     let mut session = Session::new(
//!         store,
//!         identity.watch(),
//!         SyncConfig::default(),
//!         Arc::new(SystemClock),
//!     );
//!
//!     session.start().await;
//!     while let Some(update) = session.next_update().await {
//!         println!("{:?} -> {:?}", update, session.render());
//!     }
//! }
//! ```

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod form;
pub mod identity;
pub mod session;
pub mod subscriptions;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, SyncConfig};
pub use dispatcher::{
    ActionDispatcher, Actor, DeleteTarget, PendingDeletion, Registration, ReplyOutcome,
    SavedRecord,
};
pub use error::{ActionError, Result, SessionError};
pub use form::RecordForm;
pub use identity::{Identity, IdentityError, IdentityProvider, LocalIdentityProvider};
pub use session::{Session, SessionState, SessionUpdate};
pub use subscriptions::{plan_for, LiveEvent, LiveQueries, LiveUpdate, Plan};
