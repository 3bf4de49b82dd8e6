//! SQLite database layer (embedded, no external dependencies)

use super::{MessageStore, StoreError, StoreResult, StoredMessage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tablon_types::{CachedMessage, User};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database file and run migrations.
    pub async fn open(database_path: &str) -> Result<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        if let Some(parent) = Path::new(database_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to SQLite database at: {}", database_path)
            })?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database, used by tests and ephemeral runs.
    ///
    /// Every SQLite connection to `:memory:` is a separate database, so the
    /// pool is pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory SQLite URL")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        tracing::info!("SQLite connection established, running migrations...");

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database initialization complete");

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                senderId INTEGER NOT NULL,
                content TEXT NOT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(senderId) REFERENCES users(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Release all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MessageStore for Database {
    async fn count_users(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_messages(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_user(&self, name: &str) -> StoreResult<User> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (name) VALUES (?1)
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id,
            name: name.to_string(),
        })
    }

    async fn insert_message(&self, sender_id: i64, content: &str) -> StoreResult<StoredMessage> {
        let row: (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO messages (senderId, content) VALUES (?1, ?2)
            RETURNING id, timestamp
            "#,
        )
        .bind(sender_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, sender_id))?;

        Ok(StoredMessage {
            id: row.0,
            timestamp: row.1,
        })
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row: Option<(i64, String)> = sqlx::query_as(
            r#"
            SELECT id, name FROM users WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name)| User { id, name }))
    }

    async fn recent_messages(&self, limit: i64, offset: i64) -> StoreResult<Vec<CachedMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT
                messages.id AS message_id,
                messages.content,
                messages.timestamp,
                users.id AS user_id,
                users.name
            FROM messages
            JOIN users ON messages.senderId = users.id
            ORDER BY messages.id DESC
            LIMIT ?1
            OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT id, name FROM users ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id, name)| User { id, name }).collect())
    }
}

fn map_insert_error(err: sqlx::Error, sender_id: i64) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            StoreError::UnknownSender(sender_id)
        }
        _ => StoreError::Database(err),
    }
}

// Helper struct for sqlx query_as
#[derive(sqlx::FromRow)]
struct MessageRow {
    message_id: i64,
    content: String,
    timestamp: DateTime<Utc>,
    user_id: i64,
    name: String,
}

impl From<MessageRow> for CachedMessage {
    fn from(r: MessageRow) -> Self {
        CachedMessage {
            id: r.message_id,
            content: r.content,
            timestamp: r.timestamp,
            sender: User {
                id: r.user_id,
                name: r.name,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_page_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let alice = db.insert_user("Alice").await.unwrap();
        let bob = db.insert_user("Bob").await.unwrap();

        let first = db.insert_message(alice.id, "uno").await.unwrap();
        let second = db.insert_message(bob.id, "dos").await.unwrap();
        assert!(second.id > first.id);
        assert!(second.timestamp >= first.timestamp);

        let page = db.recent_messages(10, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].content, "dos");
        assert_eq!(page[0].sender, bob);
        assert_eq!(page[1].content, "uno");
        assert_eq!(page[1].sender, alice);

        let skipped = db.recent_messages(10, 1).await.unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].id, first.id);

        assert_eq!(db.count_users().await.unwrap(), 2);
        assert_eq!(db.count_messages().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_with_unknown_sender_is_domain_error() {
        let db = Database::in_memory().await.unwrap();
        db.insert_user("Alice").await.unwrap();

        let err = db.insert_message(999, "hola").await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownSender(999)), "got {err:?}");
        assert_eq!(db.count_messages().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_and_list_users() {
        let db = Database::in_memory().await.unwrap();
        let alice = db.insert_user("Alice").await.unwrap();
        db.insert_user("Bob").await.unwrap();

        assert_eq!(db.get_user(alice.id).await.unwrap(), Some(alice));
        assert_eq!(db.get_user(42).await.unwrap(), None);

        let names: Vec<String> = db
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_open_creates_file_and_persists() {
        let dir = std::env::temp_dir().join(format!("tablon_db_{}", uuid::Uuid::new_v4()));
        let path = dir.join("mensajes.db");
        let path_str = path.to_string_lossy().to_string();

        {
            let db = Database::open(&path_str).await.unwrap();
            db.insert_user("Alice").await.unwrap();
            db.close().await;
        }

        let reopened = Database::open(&path_str).await.unwrap();
        assert_eq!(reopened.count_users().await.unwrap(), 1);
        reopened.close().await;

        let _ = std::fs::remove_dir_all(&dir);
    }
}
