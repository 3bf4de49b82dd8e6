//! Message query and ingestion service
//!
//! Reads are answered from the in-memory cache whenever the requested window
//! is the newest page; everything else goes to the store. Writes go to the
//! store first and are then appended to the cache.

use super::sanitize::{escape_html, truncate_chars};
use crate::storage::{MessageCache, MessageStore, StoreError};
use serde_json::Value;
use std::sync::Arc;
use tablon_types::{CachedMessage, SubmitMessageRequest, User, MAX_CONTENT_CHARS};
use thiserror::Error;
use tracing::{debug, info};

/// Largest page a client may request
pub const MAX_PAGE_LIMIT: i64 = 50;

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("limit must be between 1 and 50 and offset non-negative")]
    InvalidPagination,

    #[error("senderId (number) and content (text) are required")]
    InvalidMessage,

    #[error("message is empty")]
    EmptyMessage,

    #[error("sender {0} does not exist")]
    SenderNotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("ingestion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub struct MessageService {
    store: Arc<dyn MessageStore>,
    cache: Arc<MessageCache>,
}

impl MessageService {
    pub fn new(store: Arc<dyn MessageStore>, cache: Arc<MessageCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<MessageCache> {
        &self.cache
    }

    /// Reload the cache from the store.
    pub async fn refresh_cache(&self) -> Result<usize, StoreError> {
        self.cache.refresh(self.store.as_ref()).await
    }

    /// A page of messages in ascending id order, `offset` counted from the newest.
    pub async fn list_messages(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CachedMessage>, MessageError> {
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) || offset < 0 {
            return Err(MessageError::InvalidPagination);
        }

        // Only the newest page is a suffix of what the cache holds.
        if offset == 0 && limit as usize <= self.cache.capacity() {
            if let Some(messages) = self.cache.read_last(limit as usize).await {
                debug!("Messages served from cache: {}", messages.len());
                return Ok(messages);
            }
            debug!("Message cache not primed, falling back to the database");
        }

        let mut messages = self.store.recent_messages(limit, offset).await?;
        messages.reverse();
        debug!("Messages served from database: {}", messages.len());
        Ok(messages)
    }

    /// Validate, sanitize and persist a new message, then add it to the cache.
    pub async fn submit(&self, req: SubmitMessageRequest) -> Result<CachedMessage, MessageError> {
        let sender_id = parse_sender_id(req.sender_id.as_ref()).ok_or(MessageError::InvalidMessage)?;
        let content = match req.content {
            Some(Value::String(content)) if !content.is_empty() => content,
            _ => return Err(MessageError::InvalidMessage),
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(MessageError::EmptyMessage);
        }

        let safe_content = escape_html(truncate_chars(trimmed, MAX_CONTENT_CHARS));
        if safe_content.is_empty() {
            return Err(MessageError::EmptyMessage);
        }

        let sender = self
            .store
            .get_user(sender_id)
            .await?
            .ok_or(MessageError::SenderNotFound(sender_id))?;

        // Insert and append run to completion in their own task, so a dropped
        // request cannot leave a stored message missing from the cache.
        let store = self.store.clone();
        let cache = self.cache.clone();
        let message = tokio::spawn(async move {
            // The sender may vanish between the lookup and the insert.
            let stored = store
                .insert_message(sender_id, &safe_content)
                .await
                .map_err(|e| match e {
                    StoreError::UnknownSender(id) => MessageError::SenderNotFound(id),
                    other => MessageError::Store(other),
                })?;

            let message = CachedMessage {
                id: stored.id,
                content: safe_content,
                timestamp: stored.timestamp,
                sender,
            };

            cache.append(message.clone()).await;
            info!(
                "New message {} from sender {} stored. Cached messages: {}",
                message.id,
                sender_id,
                cache.len().await
            );

            Ok::<_, MessageError>(message)
        })
        .await??;

        Ok(message)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, MessageError> {
        Ok(self.store.list_users().await?)
    }
}

/// A positive integer given either as a JSON number or a decimal string.
fn parse_sender_id(value: Option<&Value>) -> Option<i64> {
    let id = match value? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}
