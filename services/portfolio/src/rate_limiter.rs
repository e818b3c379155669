//! Rate limiter for throttling credential guessing and mail flooding

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::clock::Clock;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: i64,
    /// Ban duration in seconds
    pub ban_duration_seconds: i64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    window_start: DateTime<Utc>,
    ban_expires: Option<DateTime<Utc>>,
}

/// Fixed-window attempt counter with a temporary ban once the window is exhausted
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    clock: Arc<dyn Clock>,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key` and report whether it may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();
        let window = Duration::seconds(self.config.window_seconds);

        // Keys are caller-supplied; drop anything no longer counting or banned
        entries.retain(|_, entry| {
            entry.ban_expires.is_some_and(|ban| now < ban) || now - entry.window_start < window
        });

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimiterEntry {
                attempts: 0,
                window_start: now,
                ban_expires: None,
            });

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return false;
            }
            entry.attempts = 0;
            entry.ban_expires = None;
            entry.window_start = now;
        }

        if now - entry.window_start >= window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::seconds(self.config.ban_duration_seconds));
            warn!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Forget the attempt history for `key`, e.g. after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter() -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let limiter = RateLimiter::new(RateLimiterConfig::default(), Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[tokio::test]
    async fn bans_after_max_attempts_until_ban_expires() {
        let (limiter, clock) = limiter();

        for _ in 0..5 {
            assert!(limiter.is_allowed("login:alice").await);
        }
        assert!(!limiter.is_allowed("login:alice").await);
        assert!(limiter.is_allowed("login:bob").await);

        clock.advance(Duration::minutes(30));
        assert!(!limiter.is_allowed("login:alice").await);

        clock.advance(Duration::minutes(31));
        assert!(limiter.is_allowed("login:alice").await);
    }

    #[tokio::test]
    async fn window_expiry_resets_the_counter() {
        let (limiter, clock) = limiter();

        for _ in 0..5 {
            assert!(limiter.is_allowed("k").await);
        }
        clock.advance(Duration::minutes(5));
        assert!(limiter.is_allowed("k").await);
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let (limiter, _clock) = limiter();

        for _ in 0..5 {
            limiter.is_allowed("k").await;
        }
        limiter.reset("k").await;
        assert!(limiter.is_allowed("k").await);
    }

    #[tokio::test]
    async fn lapsed_entries_are_evicted() {
        let (limiter, clock) = limiter();

        for i in 0..3 {
            limiter.is_allowed(&format!("forgot-password:user{}@x.com", i)).await;
        }
        for _ in 0..6 {
            limiter.is_allowed("login:mallory").await;
        }
        assert_eq!(limiter.entries.lock().await.len(), 4);

        clock.advance(Duration::minutes(10));
        limiter.is_allowed("login:alice").await;
        {
            let entries = limiter.entries.lock().await;
            assert_eq!(entries.len(), 2);
            assert!(entries.contains_key("login:mallory"));
            assert!(entries.contains_key("login:alice"));
        }

        clock.advance(Duration::minutes(61));
        limiter.is_allowed("login:alice").await;
        let entries = limiter.entries.lock().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("login:alice"));
    }
}
