//! Application state shared across commands.

use std::sync::Arc;

use field_sync::SyncConfig;
use record_store::SqliteStore;
use tracing::info;

use crate::error::Result;

/// Open store and loaded configuration.
#[derive(Clone)]
pub struct AppState {
    /// SQLite-backed document store.
    pub store: Arc<SqliteStore>,
    /// Sync configuration.
    pub config: SyncConfig,
}

impl AppState {
    /// Connect to the configured database and run migrations.
    pub async fn connect(config: SyncConfig) -> Result<Self> {
        let store = SqliteStore::connect(&config.database_url).await?;
        store.migrate().await?;
        info!(database = %config.database_url, "Store ready");
        Ok(Self {
            store: Arc::new(store),
            config,
        })
    }
}
