//! Identity provider seam.
//!
//! The session only needs to observe "who is signed in" as a stream of
//! `Option<Identity>` values; sign-in flows live behind [`IdentityProvider`].

use std::collections::HashMap;

use async_trait::async_trait;
use record_store::validation::validate_email;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::info;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Errors from sign-in and sign-up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account already exists for {0}")]
    EmailInUse(String),

    #[error("password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    WeakPassword,

    #[error("invalid email: {0}")]
    InvalidEmail(String),
}

/// Source of the signed-in identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Receiver that observes every identity change, starting with the
    /// current value.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;

    /// The identity signed in right now.
    fn current(&self) -> Option<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    /// Create an account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    async fn sign_out(&self);
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    salt: String,
    password_hash: String,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// In-process identity provider with salted password hashes.
pub struct LocalIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    tx: watch::Sender<Option<Identity>>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            tx,
        }
    }

    /// Resume a persisted sign-in without asking for credentials.
    pub fn restore(&self, identity: Identity) {
        info!(uid = %identity.uid, "Restored sign-in");
        self.tx.send_replace(Some(identity));
    }

    fn publish(&self, identity: &Identity) {
        self.tx.send_replace(Some(identity.clone()));
    }
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = normalize_email(email);
        let account = {
            let accounts = self.accounts.lock().await;
            accounts
                .get(&email)
                .cloned()
                .ok_or(IdentityError::InvalidCredentials)?
        };

        if hash_password(&account.salt, password) != account.password_hash {
            return Err(IdentityError::InvalidCredentials);
        }

        let identity = Identity {
            uid: account.uid,
            email,
        };
        info!(uid = %identity.uid, "Signed in");
        self.publish(&identity);
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = normalize_email(email);
        validate_email(&email).map_err(|e| IdentityError::InvalidEmail(e.to_string()))?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakPassword);
        }

        let identity = {
            let mut accounts = self.accounts.lock().await;
            if accounts.contains_key(&email) {
                return Err(IdentityError::EmailInUse(email));
            }

            let salt = uuid::Uuid::new_v4().simple().to_string();
            let account = Account {
                uid: uuid::Uuid::new_v4().simple().to_string(),
                password_hash: hash_password(&salt, password),
                salt,
            };
            let identity = Identity {
                uid: account.uid.clone(),
                email: email.clone(),
            };
            accounts.insert(email, account);
            identity
        };

        info!(uid = %identity.uid, "Account created");
        self.publish(&identity);
        Ok(identity)
    }

    async fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            info!("Signed out");
        }
    }
}
