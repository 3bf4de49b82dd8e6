//! Bounded in-memory cache of the newest messages
//!
//! Holds a contiguous suffix of the message table (oldest first, newest last)
//! so that the first page of `GET /messages` never touches SQLite.

use super::{MessageStore, StoreResult};
use std::collections::VecDeque;
use tablon_types::CachedMessage;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Default number of messages kept in memory
pub const CACHE_MAX_SIZE: usize = 50;

pub struct MessageCache {
    capacity: usize,
    state: RwLock<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: VecDeque<CachedMessage>,
    /// Set once a refresh has succeeded. Before that the entries are not
    /// guaranteed to be the newest suffix of the store.
    primed: bool,
}

impl CacheState {
    fn evict_to(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }
}

impl MessageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the contents with the newest `capacity` messages from the store.
    ///
    /// On failure the previous contents are left untouched.
    pub async fn refresh(&self, store: &dyn MessageStore) -> StoreResult<usize> {
        let mut fresh = store.recent_messages(self.capacity as i64, 0).await?;
        fresh.reverse();

        let mut state = self.state.write().await;
        // Keep anything appended while the query was in flight.
        let newest_fetched = fresh.last().map(|m| m.id).unwrap_or(i64::MIN);
        let appended: Vec<CachedMessage> = state
            .entries
            .iter()
            .filter(|m| m.id > newest_fetched)
            .cloned()
            .collect();

        state.entries = fresh.into();
        state.entries.extend(appended);
        state.evict_to(self.capacity);
        state.primed = true;

        let len = state.entries.len();
        info!("Message cache refreshed. Cached messages: {}", len);
        Ok(len)
    }

    /// Add a newly stored message, evicting the oldest entries past capacity.
    pub async fn append(&self, message: CachedMessage) {
        let mut state = self.state.write().await;
        if !state.primed {
            debug!(
                "Message cache not primed, skipping append of message {}",
                message.id
            );
            return;
        }

        let newest = state.entries.back().map(|m| m.id);
        match newest {
            Some(newest) if message.id <= newest => {
                // Another ingestion appended a newer message first.
                match state.entries.binary_search_by_key(&message.id, |m| m.id) {
                    Ok(_) => return,
                    Err(pos) => state.entries.insert(pos, message),
                }
            }
            _ => state.entries.push_back(message),
        }
        state.evict_to(self.capacity);

        debug!("Message cache updated. Cached messages: {}", state.entries.len());
    }

    /// The last `n` messages in ascending id order, or `None` while unprimed.
    pub async fn read_last(&self, n: usize) -> Option<Vec<CachedMessage>> {
        let state = self.state.read().await;
        if !state.primed {
            return None;
        }

        let skip = state.entries.len().saturating_sub(n);
        Some(state.entries.iter().skip(skip).cloned().collect())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_primed(&self) -> bool {
        self.state.read().await.primed
    }
}

impl Default for MessageCache {
    fn default() -> Self {
        Self::new(CACHE_MAX_SIZE)
    }
}
