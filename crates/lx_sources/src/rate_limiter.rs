//! Per-source daily quota tracking with dynamic throttling.
//!
//! Each upstream gets one [`RateLimiter`]. Callers await
//! [`RateLimiter::acquire_permission`] before every request; the limiter
//! spaces requests apart and widens that spacing once more than 70% of the
//! daily quota is consumed, so callers back off gradually instead of hitting
//! a hard wall. State is persisted as JSON so quotas survive restarts.

use chrono::Utc;
use lx_core::config::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const THROTTLE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiterState {
    pub remaining_requests: u32,
    /// Epoch milliseconds
    pub next_reset_time: i64,
    /// Epoch milliseconds, 0 before the first request
    pub last_request_time: i64,
    pub is_throttling: bool,
    /// Milliseconds
    pub current_delay: u64,
}

impl RateLimiterState {
    pub fn fresh(config: &RateLimitConfig, now_ms: i64) -> Self {
        Self {
            remaining_requests: config.max_requests_per_day,
            next_reset_time: now_ms + reset_interval_ms(config),
            last_request_time: 0,
            is_throttling: false,
            current_delay: config.min_request_interval.as_millis() as u64,
        }
    }
}

/// Delay enforced between requests once `remaining` requests are left.
///
/// Stays at the configured minimum until more than 70% of the quota is used,
/// then interpolates linearly up to the maximum at 100% usage.
pub fn throttle_delay(config: &RateLimitConfig, remaining: u32) -> Duration {
    let min = config.min_request_interval.as_millis() as f64;
    let max = config.max_request_interval.as_millis() as f64;
    if config.max_requests_per_day == 0 {
        return config.max_request_interval;
    }

    let max_requests = config.max_requests_per_day as u64;
    let used_requests = max_requests - (remaining as u64).min(max_requests);
    // Integer comparison keeps the 70% boundary exact
    if used_requests * 10 > max_requests * 7 {
        let used = used_requests as f64 / max_requests as f64;
        let intensity = ((used - THROTTLE_THRESHOLD) / (1.0 - THROTTLE_THRESHOLD)).min(1.0);
        Duration::from_millis((min + intensity * (max - min).max(0.0)).round() as u64)
    } else {
        config.min_request_interval
    }
}

fn reset_interval_ms(config: &RateLimitConfig) -> i64 {
    config.reset_interval_hours as i64 * 60 * 60 * 1000
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct RateLimiter {
    name: String,
    config: RateLimitConfig,
    state: Mutex<RateLimiterState>,
    state_path: Option<PathBuf>,
}

impl RateLimiter {
    pub fn new(name: &str, config: RateLimitConfig) -> Self {
        let state = RateLimiterState::fresh(&config, now_ms());
        Self::with_state(name, config, state)
    }

    pub fn with_state(name: &str, config: RateLimitConfig, mut state: RateLimiterState) -> Self {
        check_and_reset_quota(&config, &mut state, now_ms());
        Self {
            name: name.to_string(),
            config,
            state: Mutex::new(state),
            state_path: None,
        }
    }

    /// Load the limiter from `dir/api-rate-limiter-<name>.json`, starting fresh
    /// when the file is missing or unreadable.
    pub fn persistent(name: &str, config: RateLimitConfig, dir: &Path) -> Self {
        let path = dir.join(format!("api-rate-limiter-{}.json", name));
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<RateLimiterState>(&raw) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Error loading rate limiter state for {}: {}", name, e);
                    RateLimiterState::fresh(&config, now_ms())
                }
            },
            Err(_) => RateLimiterState::fresh(&config, now_ms()),
        };

        let mut limiter = Self::with_state(name, config, state);
        limiter.state_path = Some(path);
        limiter
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next request slot. Returns `false` without waiting when
    /// the quota is exhausted until the next reset.
    pub async fn acquire_permission(&self) -> bool {
        let wait_ms = {
            let mut state = self.state.lock().await;
            let now = now_ms();
            if check_and_reset_quota(&self.config, &mut state, now) {
                self.save_state(&state).await;
            }

            if state.remaining_requests == 0 {
                warn!("{} rate limit exceeded. No requests remaining until reset.", self.name);
                return false;
            }

            (state.last_request_time + state.current_delay as i64 - now).max(0) as u64
        };

        if wait_ms > 0 {
            debug!("{} throttled, waiting {}ms", self.name, wait_ms);
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }

        let mut state = self.state.lock().await;
        let now = now_ms();
        check_and_reset_quota(&self.config, &mut state, now);
        // Another caller may have taken the last slot while we slept
        if state.remaining_requests == 0 {
            return false;
        }

        state.remaining_requests -= 1;
        state.last_request_time = now;
        let delay = throttle_delay(&self.config, state.remaining_requests);
        state.is_throttling = delay > self.config.min_request_interval;
        state.current_delay = delay.as_millis() as u64;
        self.save_state(&state).await;
        true
    }

    pub async fn state(&self) -> RateLimiterState {
        let mut state = self.state.lock().await;
        check_and_reset_quota(&self.config, &mut state, now_ms());
        state.clone()
    }

    /// Written while the state lock is held so files land in update order.
    async fn save_state(&self, state: &RateLimiterState) {
        let Some(path) = &self.state_path else {
            return;
        };
        if let Err(e) = write_state(path, state).await {
            warn!("Error saving rate limiter state for {}: {}", self.name, e);
        }
    }
}

async fn write_state(path: &Path, state: &RateLimiterState) -> lx_core::Result<()> {
    let json = serde_json::to_string(state)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Restore the quota once the reset time has passed. Returns whether a reset happened.
fn check_and_reset_quota(config: &RateLimitConfig, state: &mut RateLimiterState, now: i64) -> bool {
    if now < state.next_reset_time {
        return false;
    }

    state.remaining_requests = config.max_requests_per_day;
    state.next_reset_time = now + reset_interval_ms(config);
    state.is_throttling = false;
    state.current_delay = config.min_request_interval.as_millis() as u64;
    true
}

/// Owns one limiter per upstream source id.
#[derive(Default)]
pub struct RateLimiterRegistry {
    state_dir: Option<PathBuf>,
    limiters: BTreeMap<String, Arc<RateLimiter>>,
}

impl RateLimiterRegistry {
    pub fn new(state_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = &state_dir {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!("Cannot create rate limiter state dir {}: {}", dir.display(), e);
            }
        }
        Self {
            state_dir,
            limiters: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, config: RateLimitConfig) -> Arc<RateLimiter> {
        let limiter = match &self.state_dir {
            Some(dir) => RateLimiter::persistent(name, config, dir),
            None => RateLimiter::new(name, config),
        };
        let limiter = Arc::new(limiter);
        self.limiters.insert(name.to_string(), limiter.clone());
        limiter
    }

    pub fn get(&self, name: &str) -> Option<Arc<RateLimiter>> {
        self.limiters.get(name).cloned()
    }

    pub async fn snapshot(&self) -> Vec<(String, RateLimiterState)> {
        let mut out = Vec::with_capacity(self.limiters.len());
        for (name, limiter) in &self.limiters {
            out.push((name.clone(), limiter.state().await));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quick_config(max: u32) -> RateLimitConfig {
        RateLimitConfig {
            max_requests_per_day: max,
            reset_interval_hours: 24,
            min_request_interval: Duration::ZERO,
            max_request_interval: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_acquire_decrements_until_exhausted() {
        let limiter = RateLimiter::new("test", quick_config(3));
        assert!(limiter.acquire_permission().await);
        assert!(limiter.acquire_permission().await);
        assert!(limiter.acquire_permission().await);
        assert_eq!(limiter.state().await.remaining_requests, 0);
        assert!(!limiter.acquire_permission().await);
        assert_eq!(limiter.state().await.remaining_requests, 0);
    }

    #[tokio::test]
    async fn test_exhausted_quota_resets_once_reset_time_passes() {
        let config = quick_config(5);
        let state = RateLimiterState {
            remaining_requests: 0,
            next_reset_time: now_ms() - 1,
            last_request_time: now_ms() - 10,
            is_throttling: true,
            current_delay: 0,
        };
        let limiter = RateLimiter::with_state("test", config, state);
        assert!(limiter.acquire_permission().await);
        let state = limiter.state().await;
        assert_eq!(state.remaining_requests, 4);
        assert!(state.next_reset_time > now_ms());
    }

    #[tokio::test]
    async fn test_exhausted_before_reset_is_denied() {
        let state = RateLimiterState {
            remaining_requests: 0,
            next_reset_time: now_ms() + 60_000,
            last_request_time: 0,
            is_throttling: false,
            current_delay: 0,
        };
        let limiter = RateLimiter::with_state("test", quick_config(5), state);
        assert!(!limiter.acquire_permission().await);
    }

    #[test]
    fn test_throttle_delay_is_minimum_below_threshold() {
        let config = RateLimitConfig::new(100, 1000, 10_000);
        for remaining in 30..=100 {
            assert_eq!(throttle_delay(&config, remaining), Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_throttle_delay_grows_monotonically() {
        let config = RateLimitConfig::new(100, 1000, 10_000);
        let mut previous = throttle_delay(&config, 30);
        for remaining in (0..30).rev() {
            let delay = throttle_delay(&config, remaining);
            assert!(delay >= previous, "delay shrank at remaining={}", remaining);
            previous = delay;
        }
        assert_eq!(throttle_delay(&config, 0), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn test_waits_for_minimum_spacing() {
        let config = RateLimitConfig::new(100, 50, 50);
        let limiter = RateLimiter::new("spacing", config);
        assert!(limiter.acquire_permission().await);
        let started = std::time::Instant::now();
        assert!(limiter.acquire_permission().await);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_state_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let limiter = RateLimiter::persistent("newsapi", quick_config(10), dir.path());
        assert!(limiter.acquire_permission().await);
        assert!(limiter.acquire_permission().await);

        let reloaded = RateLimiter::persistent("newsapi", quick_config(10), dir.path());
        assert_eq!(reloaded.state().await.remaining_requests, 8);
        assert!(dir.path().join("api-rate-limiter-newsapi.json").exists());
    }

    #[tokio::test]
    async fn test_registry_snapshot_lists_every_source() {
        let mut registry = RateLimiterRegistry::new(None);
        registry.register("newsapi", quick_config(100));
        registry.register("newsdata", quick_config(200));
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, "newsapi");
        assert_eq!(snapshot[1].1.remaining_requests, 200);
    }
}
