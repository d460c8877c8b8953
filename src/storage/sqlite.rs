//! SQLite-backed blob store.
//!
//! One table of `key -> body` rows. Useful when a single file is easier to ship
//! than a bucket directory.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{collapse_listing, BlobStore};
use crate::errors::AppError;

/// Blob store over a SQLite `blobs` table.
#[derive(Clone)]
pub struct SqliteBlobStore {
    pool: SqlitePool,
}

impl SqliteBlobStore {
    /// Open (or create) the database file and run migrations.
    pub async fn open(db_path: &Path) -> Result<Self, AppError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Insert or replace an object. The service itself never writes.
    #[cfg(test)]
    pub async fn put(&self, key: &str, body: &str) -> Result<(), AppError> {
        if !super::is_valid_key(key) {
            return Err(AppError::Validation(format!("Invalid blob key: {}", key)));
        }

        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO blobs (key, body, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(body.as_bytes())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT body FROM blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let body: Vec<u8> = row.get("body");
            String::from_utf8_lossy(&body).into_owned()
        }))
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 AS present FROM blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT key FROM blobs WHERE substr(key, 1, ?) = ? ORDER BY key")
            .bind(prefix.chars().count() as i64)
            .bind(prefix)
            .fetch_all(&self.pool)
            .await?;

        let keys = rows.into_iter().map(|row| row.get::<String, _>("key"));
        Ok(collapse_listing(prefix, keys))
    }
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blobs (
            key TEXT PRIMARY KEY,
            body BLOB NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
