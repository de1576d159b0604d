//! Error types for sync, session and dispatcher operations.

use record_store::{Collection, StoreError, ValidationError};
use thiserror::Error;

/// Errors returned by write actions.
///
/// Store failures are classified so callers can tell "fix your input" from
/// "try again" from "you may not do this".
#[derive(Debug, Error)]
pub enum ActionError {
    /// Input failed validation; nothing was written.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The store refused the write.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Only the owner of a document may do this.
    #[error("only the owner can {0}")]
    NotOwner(&'static str),

    /// Only supervisors may do this.
    #[error("only supervisors can {0}")]
    NotSupervisor(&'static str),

    /// The target document does not exist (anymore).
    #[error("{collection} document not found: {id}")]
    NotFound { collection: Collection, id: String },

    /// An edit was submitted for a record that was never saved.
    #[error("record has no id; save it first")]
    Unsaved,

    /// The identity already has a profile; role and team stay as registered.
    #[error("{0} is already registered")]
    AlreadyRegistered(String),

    /// A message has no resolved recipient.
    #[error("no recipient")]
    NoRecipient,

    /// Network-class failure; the same input can be retried.
    #[error("temporarily unavailable: {0}")]
    Transient(String),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl ActionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ActionError::Transient(_))
    }
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        if err.is_permission_denied() {
            return ActionError::PermissionDenied(err.to_string());
        }
        if err.is_transient() {
            return ActionError::Transient(err.to_string());
        }
        match err {
            StoreError::NotFound { collection, id } => ActionError::NotFound { collection, id },
            other => ActionError::Store(other),
        }
    }
}

/// Errors from session navigation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The call needs a routed, active session.
    #[error("no active session")]
    NotActive,

    /// Only supervisors can mount the supervisor view.
    #[error("{0} is not a supervisor")]
    NotSupervisor(String),
}

/// Result type for write actions.
pub type Result<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_classification() {
        let denied: ActionError = StoreError::PermissionDenied {
            operation: "update",
            collection: Collection::Installations,
        }
        .into();
        assert!(matches!(denied, ActionError::PermissionDenied(_)));

        let offline: ActionError = StoreError::Unavailable("offline".into()).into();
        assert!(offline.is_transient());

        let missing: ActionError = StoreError::NotFound {
            collection: Collection::Notes,
            id: "n1".into(),
        }
        .into();
        assert!(matches!(missing, ActionError::NotFound { .. }));
    }
}
