//! Store error types.

use thiserror::Error;

use crate::query::Collection;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend refused the read or write.
    #[error("permission denied: {operation} on {collection}")]
    PermissionDenied {
        operation: &'static str,
        collection: Collection,
    },

    /// The backend could not be reached. Live subscriptions keep retrying.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Document not found
    #[error("{collection} document not found: {id}")]
    NotFound { collection: Collection, id: String },

    /// A document failed to decode into its typed record.
    #[error("malformed {collection} document {id}: {reason}")]
    Malformed {
        collection: Collection,
        id: String,
        reason: String,
    },

    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// JSON encoding of a document body failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the backend denied access.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. })
    }

    /// Whether the failure is network-class and worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Sqlx(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }

    /// Build a clonable copy for fan-out to several subscribers.
    ///
    /// Wrapped library errors are not `Clone`, so they collapse into
    /// `Unavailable` carrying the rendered message.
    pub fn duplicate(&self) -> StoreError {
        match self {
            StoreError::PermissionDenied {
                operation,
                collection,
            } => StoreError::PermissionDenied {
                operation,
                collection: *collection,
            },
            StoreError::Unavailable(msg) => StoreError::Unavailable(msg.clone()),
            StoreError::NotFound { collection, id } => StoreError::NotFound {
                collection: *collection,
                id: id.clone(),
            },
            StoreError::Malformed {
                collection,
                id,
                reason,
            } => StoreError::Malformed {
                collection: *collection,
                id: id.clone(),
                reason: reason.clone(),
            },
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
