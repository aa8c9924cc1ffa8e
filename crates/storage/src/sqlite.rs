use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::{AppFields, AppRecord, RecordId, StoreError};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{FeedHub, LiveQuery, RecordStore, SnapshotFeed};

/// Durable record store keeping each document as a JSON body in sqlite.
pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
    hub: FeedHub,
    // Serializes writes and subscribe refreshes so feeds never regress to an
    // older list.
    write_lock: Mutex<()>,
}

impl SqliteRecordStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options =
            SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Each connection to an in-memory database sees its own database.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open record store at '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to migrate record store schema")?;
        info!("sqlite store: opened url={database_url}");
        Ok(Self {
            pool,
            hub: FeedHub::default(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

async fn load_ordered(
    conn: &mut SqliteConnection,
    collection: &str,
) -> Result<Vec<AppRecord>, StoreError> {
    let rows = sqlx::query(
        "SELECT id, body FROM documents
         WHERE collection = ?
         ORDER BY created_at DESC, id ASC",
    )
    .bind(collection)
    .fetch_all(conn)
    .await
    .map_err(map_sqlx_error)?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.try_get("id").map_err(map_sqlx_error)?;
        let decoded = row
            .try_get::<String, _>("body")
            .map_err(|err| err.to_string())
            .and_then(|body| {
                serde_json::from_str::<AppFields>(&body).map_err(|err| err.to_string())
            });
        match decoded {
            Ok(fields) => records.push(AppRecord::from_fields(RecordId(id), fields)),
            Err(err) => {
                warn!("sqlite store: skipping malformed document collection={collection} id={id}: {err}");
            }
        }
    }
    Ok(records)
}

fn encode_body(fields: &AppFields) -> Result<String, StoreError> {
    serde_json::to_string(fields)
        .map_err(|err| StoreError::internal(format!("failed to encode document: {err}")))
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::unavailable(err.to_string())
        }
        sqlx::Error::RowNotFound => StoreError::not_found(err.to_string()),
        other => StoreError::internal(other.to_string()),
    }
}

fn unknown_document(collection: &str, id: &RecordId) -> StoreError {
    StoreError::not_found(format!("no document {id} in collection {collection}"))
}

// Each write runs the mutation and the reload of the ordered list in one
// transaction and publishes only after commit. An error therefore means
// nothing was committed.
#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn subscribe(&self, query: &LiveQuery) -> Result<SnapshotFeed, StoreError> {
        query.ensure_supported()?;
        let _guard = self.write_lock.lock().await;
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let current = load_ordered(&mut conn, &query.collection).await?;
        Ok(self.hub.refresh_and_subscribe(&query.collection, current))
    }

    async fn create(&self, collection: &str, fields: &AppFields) -> Result<RecordId, StoreError> {
        let id = RecordId::generate();
        let body = encode_body(fields)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("INSERT INTO documents (collection, id, created_at, body) VALUES (?, ?, ?, ?)")
            .bind(collection)
            .bind(id.as_str())
            .bind(fields.created_at)
            .bind(body)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let records = load_ordered(&mut *tx, collection).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        self.hub.publish(collection, records);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &RecordId,
        fields: &AppFields,
    ) -> Result<(), StoreError> {
        let body = encode_body(fields)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let result = sqlx::query(
            "UPDATE documents SET created_at = ?, body = ? WHERE collection = ? AND id = ?",
        )
        .bind(fields.created_at)
        .bind(body)
        .bind(collection)
        .bind(id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(unknown_document(collection, id));
        }
        let records = load_ordered(&mut *tx, collection).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        self.hub.publish(collection, records);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(unknown_document(collection, id));
        }
        let records = load_ordered(&mut *tx, collection).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        self.hub.publish(collection, records);
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}
