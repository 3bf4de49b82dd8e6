//! Storage layer
//!
//! Uses SQLite (embedded) as the authoritative store for users and messages.
//! Uses in-memory structures for the recent-message cache and the session registry.

pub mod db;
pub mod message_cache;
pub mod seed;
pub mod sessions;

pub use db::Database;
pub use message_cache::{MessageCache, CACHE_MAX_SIZE};
pub use sessions::SessionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tablon_types::{CachedMessage, User};
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The message references a user that does not exist (foreign key violation)
    #[error("Unknown sender: {0}")]
    UnknownSender(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Id and server-assigned timestamp of a freshly inserted message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
}

/// Persistence for users and messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn count_users(&self) -> StoreResult<i64>;
    async fn count_messages(&self) -> StoreResult<i64>;
    async fn insert_user(&self, name: &str) -> StoreResult<User>;
    async fn insert_message(&self, sender_id: i64, content: &str) -> StoreResult<StoredMessage>;
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    /// Messages joined with their sender, newest first.
    async fn recent_messages(&self, limit: i64, offset: i64) -> StoreResult<Vec<CachedMessage>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
}
