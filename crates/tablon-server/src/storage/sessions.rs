//! In-memory session registry using DashMap
//!
//! Tracks which session ids the server has issued. A session is created for
//! every visitor without one, and CSRF tokens are bound to it.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Session ids with TTL expiry
pub struct SessionStore {
    data: Arc<DashMap<String, Instant>>,
    ttl: Duration,
}

impl SessionStore {
    /// Must be called inside a Tokio runtime: it spawns the expiry sweeper.
    pub fn new(ttl: Duration) -> Self {
        let store = Self {
            data: Arc::new(DashMap::new()),
            ttl,
        };

        store.start_cleanup_task();

        store
    }

    /// Register a fresh session and return its id
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.data.insert(id.clone(), Instant::now() + self.ttl);
        id
    }

    /// Check that the session exists and has not expired
    pub fn is_active(&self, id: &str) -> bool {
        let expired = match self.data.get(id) {
            Some(expires_at) => Instant::now() > *expires_at,
            None => return false,
        };

        if expired {
            self.data.remove(id);
        }
        !expired
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn start_cleanup_task(&self) {
        let data = self.data.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;

                let now = Instant::now();
                data.retain(|_, expires_at| *expires_at >= now);
            }
        });
    }
}
