//! Per-identity write rate limiting
//!
//! Fixed window on a monotonic clock. A denial is advisory: the
//! ingestion service still reports success to the caller and simply
//! skips persistence, so an abusive client gets no signal to tune its
//! request rate against. Counters are ephemeral; nothing here is a
//! source of truth.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::types::UserId;

struct Window {
    started_at: Instant,
    count: u32,
}

/// Bounds accepted writes per identity per window
pub struct RateLimiter {
    ceiling: u32,
    window: Duration,
    windows: DashMap<UserId, Window>,
}

impl RateLimiter {
    /// Ceiling of accepted writes per rolling minute
    pub fn per_minute(ceiling: u32) -> Self {
        Self::new(ceiling, Duration::from_secs(60))
    }

    pub fn new(ceiling: u32, window: Duration) -> Self {
        Self {
            ceiling,
            window,
            windows: DashMap::new(),
        }
    }

    /// Try to admit one write for `identity` at `now`.
    ///
    /// The entry guard holds the key's shard lock, so concurrent calls
    /// for one identity serialize and the counter never over-admits.
    /// Window rollover resets the counter; slack at the boundary is
    /// bounded by one extra window's worth of writes.
    pub fn try_admit(&self, identity: UserId, now: Instant) -> bool {
        let mut entry = self.windows.entry(identity).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= self.ceiling {
            return false;
        }

        entry.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ceiling_enforced_within_window() {
        let limiter = RateLimiter::per_minute(5);
        let id = UserId::new();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.try_admit(id, now));
        }
        assert!(!limiter.try_admit(id, now));
    }

    #[test]
    fn test_window_rollover_resets_counter() {
        let limiter = RateLimiter::new(2, Duration::from_millis(10));
        let id = UserId::new();
        let start = Instant::now();

        assert!(limiter.try_admit(id, start));
        assert!(limiter.try_admit(id, start));
        assert!(!limiter.try_admit(id, start));

        let later = start + Duration::from_millis(11);
        assert!(limiter.try_admit(id, later));
    }

    #[test]
    fn test_identities_do_not_share_budget() {
        let limiter = RateLimiter::per_minute(1);
        let now = Instant::now();
        let a = UserId::new();
        let b = UserId::new();

        assert!(limiter.try_admit(a, now));
        assert!(!limiter.try_admit(a, now));
        assert!(limiter.try_admit(b, now));
    }

    #[tokio::test]
    async fn test_concurrent_admissions_never_exceed_ceiling() {
        let limiter = Arc::new(RateLimiter::per_minute(10));
        let id = UserId::new();
        let now = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..100 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.try_admit(id, now) }));
        }

        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }
}
