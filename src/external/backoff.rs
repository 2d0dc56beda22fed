//! Per-path rate-limit bookkeeping for the outbound client.
//!
//! Each 429 doubles the cooling delay for that path; from the third
//! consecutive 429 the window is doubled again up to a hard cap. Any other
//! status clears the path.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;

use crate::config::BackoffConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackoffEntry {
    /// Consecutive 429 responses
    pub count: u32,
    pub cooling_until: Option<DateTime<Utc>>,
}

/// Shared by clones; one instance per client.
#[derive(Debug, Clone)]
pub struct BackoffState {
    entries: Arc<DashMap<String, BackoffEntry>>,
    config: BackoffConfig,
}

impl BackoffState {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// `Err(retry_at)` while `path` is cooling at `now`
    pub fn check(&self, path: &str, now: DateTime<Utc>) -> Result<(), DateTime<Utc>> {
        match self.entries.get(normalize_path(path)).and_then(|entry| entry.cooling_until) {
            Some(until) if now < until => Err(until),
            _ => Ok(()),
        }
    }

    /// Register a 429 for `path` and return the cooling window applied.
    pub fn record_rate_limited(&self, path: &str, now: DateTime<Utc>) -> Duration {
        let jitter = if self.config.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.config.jitter_ms)
        };

        let mut entry = self
            .entries
            .entry(normalize_path(path).to_string())
            .or_default();
        entry.count = entry.count.saturating_add(1);
        let window = cooling_window(&self.config, entry.count, jitter);
        entry.cooling_until = TimeDelta::from_std(window)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta));
        window
    }

    pub fn record_success(&self, path: &str) {
        self.entries.remove(normalize_path(path));
    }

    pub fn reset(&self) {
        self.entries.clear();
    }

    /// Consecutive 429 count, zero for unknown paths
    pub fn count(&self, path: &str) -> u32 {
        self.entries.get(normalize_path(path)).map_or(0, |entry| entry.count)
    }

    pub fn stats(&self) -> BTreeMap<String, BackoffEntry> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

/// `min(2^(count-1) * base + jitter, max_delay)`, doubled and capped again
/// once `count` reaches the extended threshold.
pub fn cooling_window(config: &BackoffConfig, count: u32, jitter_ms: u64) -> Duration {
    let exponent = count.saturating_sub(1);
    let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    let delay = config
        .base_delay_ms
        .saturating_mul(factor)
        .saturating_add(jitter_ms)
        .min(config.max_delay_ms);

    let window = if count >= config.extended_threshold {
        delay.saturating_mul(2).min(config.extended_max_ms)
    } else {
        delay
    };
    Duration::from_millis(window)
}

/// Request path without query string or fragment, used as the state key.
pub fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_cooling_window_progression() {
        let config = BackoffConfig::default();
        assert_eq!(cooling_window(&config, 1, 0), Duration::from_millis(500));
        assert_eq!(cooling_window(&config, 2, 0), Duration::from_millis(1_000));
        // third 429 enters extended cooling: 2000ms doubled
        assert_eq!(cooling_window(&config, 3, 0), Duration::from_millis(4_000));
        assert_eq!(cooling_window(&config, 5, 100), Duration::from_millis(16_200));
        // delay caps at 15s, extended window at 30s
        assert_eq!(cooling_window(&config, 7, 150), Duration::from_millis(30_000));
        assert_eq!(cooling_window(&config, 200, 150), Duration::from_millis(30_000));
    }

    #[test]
    fn test_extended_cap_applies() {
        let config = BackoffConfig {
            max_delay_ms: 50_000,
            ..BackoffConfig::default()
        };
        assert_eq!(cooling_window(&config, 10, 0), Duration::from_millis(60_000));
    }

    #[test]
    fn test_fresh_path_is_ready() {
        let state = BackoffState::new(BackoffConfig::default());
        assert!(state.check("/api/leads", now()).is_ok());
        assert_eq!(state.count("/api/leads"), 0);
    }

    #[test]
    fn test_rate_limited_path_cools() {
        let state = BackoffState::new(BackoffConfig::default());
        let window = state.record_rate_limited("/api/leads", now());
        assert!(window >= Duration::from_millis(500));
        assert!(window <= Duration::from_millis(650));

        let retry_at = state.check("/api/leads", now()).unwrap_err();
        assert!(retry_at > now());
        assert!(state.check("/api/leads", retry_at).is_ok());
        assert!(state.check("/api/contacts", now()).is_ok());
    }

    #[test]
    fn test_success_resets_after_many_429s() {
        let state = BackoffState::new(BackoffConfig::default());
        for _ in 0..6 {
            state.record_rate_limited("/api/leads", now());
        }
        assert_eq!(state.count("/api/leads"), 6);

        state.record_success("/api/leads");
        assert_eq!(state.count("/api/leads"), 0);
        assert!(state.check("/api/leads", now()).is_ok());
    }

    #[test]
    fn test_reset_and_stats() {
        let state = BackoffState::new(BackoffConfig::default());
        state.record_rate_limited("/a", now());
        state.record_rate_limited("/b", now());
        state.record_rate_limited("/b", now());

        let stats = state.stats();
        assert_eq!(stats["/a"].count, 1);
        assert_eq!(stats["/b"].count, 2);
        assert!(stats["/b"].cooling_until.is_some());

        state.reset();
        assert!(state.stats().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let state = BackoffState::new(BackoffConfig::default());
        let clone = state.clone();
        clone.record_rate_limited("/a", now());
        assert_eq!(state.count("/a"), 1);
    }

    #[test]
    fn test_query_string_shares_entry() {
        let state = BackoffState::new(BackoffConfig::default());
        state.record_rate_limited("/api/leads?page=1", now());
        state.record_rate_limited("/api/leads?page=2", now());
        assert_eq!(state.count("/api/leads"), 2);
        assert!(state.check("/api/leads?page=3", now()).is_err());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/api/leads?page=2"), "/api/leads");
        assert_eq!(normalize_path("/api/leads#top"), "/api/leads");
        assert_eq!(normalize_path("/api/leads"), "/api/leads");
    }

    proptest! {
        #[test]
        fn prop_window_is_bounded(count in 1u32..100, jitter in 0u64..=150) {
            let config = BackoffConfig::default();
            let window = cooling_window(&config, count, jitter).as_millis() as u64;
            prop_assert!(window >= config.base_delay_ms);
            if count >= config.extended_threshold {
                prop_assert!(window <= config.extended_max_ms);
            } else {
                prop_assert!(window <= config.max_delay_ms);
            }
        }

        #[test]
        fn prop_window_never_shrinks(count in 1u32..60) {
            let config = BackoffConfig::default();
            prop_assert!(cooling_window(&config, count + 1, 0) >= cooling_window(&config, count, 0));
        }
    }
}
