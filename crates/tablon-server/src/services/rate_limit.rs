//! Sliding window rate limiting per client
//!
//! In-memory only: each client key maps to the instants of its accepted
//! requests within the current window.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Upper bound on tracked clients before idle windows are pruned
pub const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum accepted requests per window
    pub max_requests: u32,
    pub window: Duration,
    pub max_tracked_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 500,
            window: Duration::from_secs(15 * 60),
            max_tracked_clients: MAX_TRACKED_CLIENTS,
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    /// Requests left in the current window after this one
    pub remaining: u32,
    /// Seconds until the oldest counted request leaves the window
    pub reset_in_seconds: u64,
}

pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    config: RateLimitConfig,
    /// Earliest instant at which a pruning pass can free anything
    next_prune: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
            next_prune: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a request from `key` and decide whether it may proceed.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let window_start = now.checked_sub(self.config.window);

        if self.windows.len() > self.config.max_tracked_clients {
            self.prune(now, window_start);
        }

        let mut entry = self.windows.entry(key.to_string()).or_default();
        let window = entry.value_mut();
        drop_expired(window, window_start);

        let limit = self.config.max_requests;
        let count = window.len() as u32;
        let allowed = count < limit;
        if allowed {
            window.push_back(now);
        }

        let used = window.len() as u32;
        let reset_in_seconds = window
            .front()
            .map(|oldest| {
                let elapsed = now.saturating_duration_since(*oldest);
                let left = self.config.window.saturating_sub(elapsed);
                left.as_secs() + u64::from(left.subsec_nanos() > 0)
            })
            .unwrap_or(0);

        RateLimitDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(used),
            reset_in_seconds,
        }
    }

    /// Drop idle clients, at most once per expiry of the oldest tracked request.
    fn prune(&self, now: Instant, window_start: Option<Instant>) {
        let mut next_prune = self
            .next_prune
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if next_prune.is_some_and(|at| now < at) {
            return;
        }

        let window_len = self.config.window;
        let mut earliest: Option<Instant> = None;
        self.windows.retain(|_, window| {
            drop_expired(window, window_start);
            if let Some(&oldest) = window.front() {
                let expires = oldest + window_len;
                earliest = Some(earliest.map_or(expires, |e| e.min(expires)));
            }
            !window.is_empty()
        });
        *next_prune = earliest;
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

fn drop_expired(window: &mut VecDeque<Instant>, window_start: Option<Instant>) {
    let Some(start) = window_start else {
        return;
    };
    while let Some(&oldest) = window.front() {
        if oldest <= start {
            window.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            max_tracked_clients: MAX_TRACKED_CLIENTS,
        })
    }

    #[test]
    fn test_blocks_after_limit() {
        let limiter = limiter(3, 60);

        let decisions: Vec<_> = (0..4).map(|_| limiter.check("1.2.3.4")).collect();
        assert!(decisions[..3].iter().all(|d| d.allowed));
        assert_eq!(decisions[0].remaining, 2);
        assert_eq!(decisions[2].remaining, 0);
        assert!(!decisions[3].allowed);
        assert_eq!(decisions[3].limit, 3);
        assert!(decisions[3].reset_in_seconds > 0 && decisions[3].reset_in_seconds <= 60);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 60);

        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(2, 10);
        let start = Instant::now();

        assert!(limiter.check_at("a", start).allowed);
        assert!(limiter.check_at("a", start + Duration::from_secs(5)).allowed);
        assert!(!limiter.check_at("a", start + Duration::from_secs(6)).allowed);

        // The first request leaves the window, freeing exactly one slot
        assert!(limiter.check_at("a", start + Duration::from_secs(11)).allowed);
        assert!(!limiter.check_at("a", start + Duration::from_secs(12)).allowed);
        assert!(limiter.check_at("a", start + Duration::from_secs(16)).allowed);
    }

    #[test]
    fn test_rejected_requests_do_not_extend_the_window() {
        let limiter = limiter(1, 10);
        let start = Instant::now();

        assert!(limiter.check_at("a", start).allowed);
        for s in 1..10 {
            assert!(!limiter.check_at("a", start + Duration::from_secs(s)).allowed);
        }
        assert!(limiter.check_at("a", start + Duration::from_secs(10)).allowed);
    }

    #[test]
    fn test_idle_clients_are_pruned() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 5,
            window: Duration::from_secs(10),
            max_tracked_clients: 2,
        });
        let start = Instant::now();

        for key in ["a", "b", "c"] {
            limiter.check_at(key, start);
        }
        assert_eq!(limiter.tracked_clients(), 3);

        limiter.check_at("d", start + Duration::from_secs(20));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_busy_clients_are_not_rescanned_before_expiry() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 5,
            window: Duration::from_secs(10),
            max_tracked_clients: 2,
        });
        let start = Instant::now();

        for key in ["a", "b", "c"] {
            limiter.check_at(key, start);
        }
        limiter.check_at("d", start + Duration::from_secs(1));
        assert_eq!(
            *limiter.next_prune.lock().unwrap(),
            Some(start + Duration::from_secs(10))
        );

        // Nothing can expire yet, so no pass runs and every client stays
        limiter.check_at("e", start + Duration::from_secs(2));
        assert_eq!(limiter.tracked_clients(), 5);
        assert_eq!(
            *limiter.next_prune.lock().unwrap(),
            Some(start + Duration::from_secs(10))
        );

        // a, b, c leave their windows; d and e remain
        limiter.check_at("f", start + Duration::from_secs(10));
        assert_eq!(limiter.tracked_clients(), 3);
        assert_eq!(
            *limiter.next_prune.lock().unwrap(),
            Some(start + Duration::from_secs(11))
        );
    }
}
