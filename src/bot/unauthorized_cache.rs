//! Throttling for "restricted to the owner" replies
//!
//! Strangers hitting `/start` on an owner-only bot get the restriction notice
//! at most once per cooldown window, so the bot never floods Telegram with
//! identical replies.

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Remembers when each stranger was last told the bot is restricted.
#[derive(Clone)]
pub struct UnauthorizedCache {
    /// user_id -> time of the last restriction reply
    replied_at: Cache<i64, Instant>,
    cooldown: Duration,
    silenced_count: Arc<AtomicU64>,
}

impl UnauthorizedCache {
    /// Creates a new cache.
    ///
    /// * `cooldown_secs` - minimum gap between two replies to the same user
    /// * `ttl_secs` - how long a user is remembered at all
    /// * `max_capacity` - maximum number of remembered users
    ///
    /// # Examples
    ///
    /// ```
    /// use overseerr_bot::bot::UnauthorizedCache;
    ///
    /// let cache = UnauthorizedCache::new(1200, 7200, 10_000);
    /// assert_eq!(cache.cooldown().as_secs(), 1200);
    /// ```
    #[must_use]
    pub fn new(cooldown_secs: u64, ttl_secs: u64, max_capacity: u64) -> Self {
        let replied_at = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs.max(cooldown_secs)))
            .build();

        Self {
            replied_at,
            cooldown: Duration::from_secs(cooldown_secs),
            silenced_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether the restriction notice should be sent to `user_id` now.
    ///
    /// Silenced attempts are counted; every 100th one is logged.
    pub async fn should_send(&self, user_id: i64, user_name: &str) -> bool {
        match self.replied_at.get(&user_id).await {
            Some(at) if at.elapsed() < self.cooldown => {}
            _ => return true,
        }

        let count = self.silenced_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count.is_multiple_of(100) {
            debug!(
                "⛔️ Silenced {} restricted-bot attempts (recent: user {} - {})",
                count, user_id, user_name
            );
        }

        false
    }

    /// Starts the cooldown for `user_id` after a notice went out.
    pub async fn mark_sent(&self, user_id: i64) {
        self.replied_at.insert(user_id, Instant::now()).await;
    }

    /// Number of users currently remembered
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.replied_at.entry_count()
    }

    /// Total number of silenced attempts
    #[must_use]
    pub fn silenced_count(&self) -> u64 {
        self.silenced_count.load(Ordering::Relaxed)
    }

    /// Configured cooldown
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Human-readable statistics for `/stats`
    #[must_use]
    pub fn stats_text(&self) -> String {
        format!(
            "Unauthorized access stats\n\nCooldown: {} min\nRemembered users: {}\nSilenced attempts: {}",
            self.cooldown.as_secs() / 60,
            self.entry_count(),
            self.silenced_count()
        )
    }
}
