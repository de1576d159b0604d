//! SQLite-backed document store.
//!
//! The durable offline cache. Each document is one row holding its JSON
//! body; equality filters are evaluated with `json_extract` and results come
//! back in insertion order.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::{Fields, RawDocument};
use crate::error::{Result, StoreError};
use crate::query::{Collection, FilterValue, Query};
use crate::store::DocumentStore;
use crate::subscription::{self, LiveRegistry, Subscription};

/// Connection wrapper implementing [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    live: Arc<LiveRegistry>,
    /// Held while a live query is read and its snapshot delivered.
    publish: Arc<Mutex<()>>,
}

enum Bind {
    Text(String),
    Int(i64),
}

impl SqliteStore {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 5;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// An in-memory database must use a pool size of one, since every
    /// connection would otherwise see its own empty database.
    ///
    /// ```no_run
    /// # async fn example() -> record_store::Result<()> {
    /// let store = record_store::SqliteStore::connect("sqlite:fieldtrack.db?mode=rwc").await?;
    /// store.migrate().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        let pool_size = if url.contains(":memory:") {
            1
        } else {
            Self::DEFAULT_POOL_SIZE
        };
        Self::connect_with_pool_size(url, pool_size).await
    }

    /// Connect with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        info!("Connected to document cache: {} (pool size: {})", url, pool_size);

        Ok(Self {
            pool,
            live: Arc::new(LiveRegistry::new()),
            publish: Arc::new(Mutex::new(())),
        })
    }

    /// Run schema migrations. Call once after connecting.
    pub async fn migrate(&self) -> Result<()> {
        info!("Running document cache migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Number of live subscriptions still open.
    pub fn active_subscriptions(&self) -> usize {
        self.live.len()
    }

    async fn run_query(&self, query: &Query) -> Result<Vec<RawDocument>> {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
        let mut binds = vec![Bind::Text(query.collection.as_str().to_string())];

        for filter in &query.filters {
            let path = json_path(&filter.field);
            match &filter.value {
                FilterValue::Text(text) => {
                    sql.push_str(" AND json_type(body, ?) = 'text' AND json_extract(body, ?) = ?");
                    binds.push(Bind::Text(path.clone()));
                    binds.push(Bind::Text(path));
                    binds.push(Bind::Text(text.clone()));
                }
                FilterValue::Bool(flag) => {
                    sql.push_str(" AND json_type(body, ?) = ?");
                    binds.push(Bind::Text(path));
                    binds.push(Bind::Text(if *flag { "true" } else { "false" }.to_string()));
                }
            }
        }

        sql.push_str(" ORDER BY seq");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            binds.push(Bind::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let mut statement = sqlx::query_as::<_, (String, String)>(&sql);
        for bind in binds {
            statement = match bind {
                Bind::Text(text) => statement.bind(text),
                Bind::Int(n) => statement.bind(n),
            };
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|(id, body)| decode_body(query.collection, id, &body))
            .collect()
    }

    /// Re-run every live query on `collection` after a committed write.
    async fn broadcast(&self, collection: Collection) {
        let _publish = self.publish.lock().await;
        for sink in self.live.interested(collection) {
            match self.run_query(sink.query()).await {
                Ok(docs) => {
                    sink.deliver(docs);
                }
                Err(err) => {
                    warn!(query = %sink.query(), error = %err, "Failed to refresh live query");
                    sink.fail(err);
                }
            }
        }
    }
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

fn decode_body(collection: Collection, id: String, body: &str) -> Result<RawDocument> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(fields) => Ok(RawDocument::new(id, fields)),
        other => Err(StoreError::Malformed {
            collection,
            id,
            reason: format!("body is not an object: {}", other),
        }),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn subscribe(&self, query: Query) -> Subscription {
        let (sink, subscription) = subscription::channel(query);
        // Registered before the initial read: a write committed after the
        // read broadcasts to this sink once the lock is free.
        let _publish = self.publish.lock().await;
        self.live.register(sink.clone());
        match self.run_query(sink.query()).await {
            Ok(docs) => {
                debug!(query = %sink.query(), "Opened live query");
                sink.deliver(docs);
            }
            Err(err) => {
                warn!(query = %sink.query(), error = %err, "Live query failed");
                sink.fail(err);
            }
        }
        subscription
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<RawDocument>> {
        self.run_query(query).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RawDocument>> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT body
            FROM documents
            WHERE collection = ? AND id = ?
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(body,)| decode_body(collection, id.to_string(), &body))
            .transpose()
    }

    async fn add(&self, collection: Collection, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(&fields)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(collection.as_str())
        .bind(&id)
        .bind(&body)
        .execute(&self.pool)
        .await?;

        debug!(%collection, %id, "Added document");
        self.broadcast(collection).await;
        Ok(id)
    }

    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        let body = serde_json::to_string(&fields)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES (?, ?, ?)
            ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(&body)
        .execute(&self.pool)
        .await?;

        debug!(%collection, %id, "Set document");
        self.broadcast(collection).await;
        Ok(())
    }

    /// Merge with `json_patch`. A `null` value removes the key.
    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        let patch = serde_json::to_string(&fields)?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = json_patch(body, ?)
            WHERE collection = ? AND id = ?
            "#,
        )
        .bind(&patch)
        .bind(collection.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }

        debug!(%collection, %id, "Updated document");
        self.broadcast(collection).await;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }

        debug!(%collection, %id, "Deleted document");
        self.broadcast(collection).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    async fn test_store() -> SqliteStore {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_document_crud() {
        let store = test_store().await;

        // Create
        let id = store
            .add(
                Collection::Installations,
                fields(json!({"Name": "Jane", "Team": "Julia", "JobStatus": "Pending"})),
            )
            .await
            .unwrap();

        // Read
        let doc = store.get(Collection::Installations, &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["Name"], json!("Jane"));

        // Update merges
        store
            .update(Collection::Installations, &id, fields(json!({"JobStatus": "Installed"})))
            .await
            .unwrap();
        let doc = store.get(Collection::Installations, &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["JobStatus"], json!("Installed"));
        assert_eq!(doc.fields["Team"], json!("Julia"));

        // Delete
        store.delete(Collection::Installations, &id).await.unwrap();
        assert!(store.get(Collection::Installations, &id).await.unwrap().is_none());
        assert!(matches!(
            store.delete(Collection::Installations, &id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_equality_filters() {
        let store = test_store().await;
        for (uid, read) in [("u1", false), ("u1", true), ("u2", false), ("u1", false)] {
            store
                .add(
                    Collection::Messages,
                    fields(json!({"recipientUid": uid, "read": read, "content": "x"})),
                )
                .await
                .unwrap();
        }
        // A string "false" must not match the boolean filter.
        store
            .add(
                Collection::Messages,
                fields(json!({"recipientUid": "u1", "read": "false"})),
            )
            .await
            .unwrap();

        let query = Query::new(Collection::Messages)
            .where_eq("recipientUid", "u1")
            .where_eq("read", false);
        assert_eq!(store.fetch(&query).await.unwrap().len(), 2);
        assert_eq!(store.fetch(&query.clone().limit(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_keeps_insertion_position() {
        let store = test_store().await;
        store
            .set(Collection::Users, "a", fields(json!({"displayName": "A", "team": "Julia"})))
            .await
            .unwrap();
        store
            .set(Collection::Users, "b", fields(json!({"displayName": "B", "team": "Julia"})))
            .await
            .unwrap();
        store
            .set(Collection::Users, "a", fields(json!({"displayName": "A2", "team": "Julia"})))
            .await
            .unwrap();

        let docs = store.fetch(&Query::new(Collection::Users)).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(docs[0].fields["displayName"], json!("A2"));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = test_store().await;
        let result = store
            .update(Collection::Notes, "missing", fields(json!({"content": "x"})))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_live_query_redelivers_on_write() {
        let store = test_store().await;
        let mut sub = store
            .subscribe(Query::new(Collection::Notes).where_eq("createdByUid", "u1"))
            .await;
        assert!(sub.next().await.unwrap().unwrap().docs.is_empty());

        store
            .add(Collection::Notes, fields(json!({"createdByUid": "u1", "content": "a"})))
            .await
            .unwrap();
        let snapshot = sub.next().await.unwrap().unwrap();
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.docs.len(), 1);

        sub.cancel();
        assert_eq!(store.active_subscriptions(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_subscribe_during_writes_sees_final_state() {
        use futures::FutureExt;

        let store = test_store().await;
        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..20 {
                    store
                        .add(Collection::Notes, fields(json!({"createdByUid": "u1", "n": i})))
                        .await
                        .unwrap();
                }
            })
        };

        let mut subs = Vec::new();
        for _ in 0..20 {
            subs.push(
                store
                    .subscribe(Query::new(Collection::Notes).where_eq("createdByUid", "u1"))
                    .await,
            );
        }
        writer.await.unwrap();

        for sub in &mut subs {
            let mut last = None;
            while let Some(Some(Ok(snapshot))) = sub.next().now_or_never() {
                last = Some(snapshot);
            }
            assert_eq!(last.unwrap().docs.len(), 20);
        }
    }
}
