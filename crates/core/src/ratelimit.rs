//! Per-requester admission control with minute and hour windows.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub per_minute: u32,
    pub per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { per_minute: 10, per_hour: 100 }
    }
}

#[derive(Clone, Debug)]
struct WindowCounter {
    window_start: DateTime<Utc>,
    count: u32,
}

impl WindowCounter {
    fn admit(&mut self, bucket_start: DateTime<Utc>, threshold: u32) -> bool {
        if self.window_start != bucket_start {
            self.window_start = bucket_start;
            self.count = 0;
        }
        if self.count >= threshold {
            return false;
        }
        self.count += 1;
        true
    }
}

#[derive(Clone, Debug)]
struct RequesterWindows {
    minute: WindowCounter,
    hour: WindowCounter,
    last_seen: DateTime<Utc>,
}

/// Tracks two independent counters per requester, keyed by minute and hour
/// buckets. Exceeding either threshold denies the call without incrementing
/// further; denial is terminal and user-visible, never retried internally.
#[derive(Debug, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, RequesterWindows>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config, windows: Mutex::new(HashMap::new()) }
    }

    pub fn allow(&self, requester_id: &str) -> bool {
        self.allow_at(requester_id, Utc::now())
    }

    /// Deterministic variant used by tests and by callers that already hold a
    /// tick timestamp.
    pub fn allow_at(&self, requester_id: &str, now: DateTime<Utc>) -> bool {
        let minute_start = truncate_to(now, 60);
        let hour_start = truncate_to(now, 3_600);

        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Stale entries are evicted lazily to bound memory; one hour is the
        // longest tracked window.
        windows.retain(|_, entry| now - entry.last_seen <= Duration::hours(1));

        let entry = windows.entry(requester_id.to_string()).or_insert_with(|| RequesterWindows {
            minute: WindowCounter { window_start: minute_start, count: 0 },
            hour: WindowCounter { window_start: hour_start, count: 0 },
            last_seen: now,
        });
        entry.last_seen = now;

        // Check both thresholds before incrementing either so a denial does
        // not consume quota from the other window.
        let minute_open = entry.minute.window_start != minute_start
            || entry.minute.count < self.config.per_minute;
        let hour_open =
            entry.hour.window_start != hour_start || entry.hour.count < self.config.per_hour;
        if !minute_open || !hour_open {
            return false;
        }

        let minute_ok = entry.minute.admit(minute_start, self.config.per_minute);
        let hour_ok = entry.hour.admit(hour_start, self.config.per_hour);
        minute_ok && hour_ok
    }
}

fn truncate_to(now: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    let stamp = now.timestamp();
    DateTime::from_timestamp(stamp - stamp.rem_euclid(seconds), 0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{RateLimitConfig, RateLimiter};

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 0).unwrap()
    }

    #[test]
    fn denies_the_eleventh_call_within_one_minute() {
        let limiter = RateLimiter::new(RateLimitConfig { per_minute: 10, per_hour: 100 });
        let now = fixed_now();

        for _ in 0..10 {
            assert!(limiter.allow_at("agent-x", now));
        }
        assert!(!limiter.allow_at("agent-x", now + Duration::seconds(30)));
    }

    #[test]
    fn admits_again_once_the_minute_window_rolls_over() {
        let limiter = RateLimiter::new(RateLimitConfig { per_minute: 10, per_hour: 100 });
        let now = fixed_now();

        for _ in 0..10 {
            assert!(limiter.allow_at("agent-x", now));
        }
        assert!(!limiter.allow_at("agent-x", now));
        assert!(limiter.allow_at("agent-x", now + Duration::seconds(61)));
    }

    #[test]
    fn hour_threshold_denies_even_across_minute_buckets() {
        let limiter = RateLimiter::new(RateLimitConfig { per_minute: 10, per_hour: 20 });
        let now = fixed_now();

        let mut admitted = 0;
        for minute in 0..3 {
            for _ in 0..10 {
                if limiter.allow_at("agent-x", now + Duration::minutes(minute)) {
                    admitted += 1;
                }
            }
        }
        assert_eq!(admitted, 20);
    }

    #[test]
    fn requesters_are_tracked_independently() {
        let limiter = RateLimiter::new(RateLimitConfig { per_minute: 1, per_hour: 100 });
        let now = fixed_now();

        assert!(limiter.allow_at("alice", now));
        assert!(!limiter.allow_at("alice", now));
        assert!(limiter.allow_at("bob", now));
    }

    #[test]
    fn stale_entries_are_evicted_after_an_hour() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let now = fixed_now();

        assert!(limiter.allow_at("drive-by", now));
        // A later call from anyone sweeps entries idle for over an hour.
        assert!(limiter.allow_at("other", now + Duration::hours(2)));

        let windows = limiter.windows.lock().unwrap();
        assert!(!windows.contains_key("drive-by"));
        assert!(windows.contains_key("other"));
    }
}
