use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use chrono::{DateTime, Utc, Duration};

use crate::config::RateLimitSettings;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_size: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_size: Duration::minutes(15),
            max_requests: 100,
        }
    }
}

impl RateLimitConfig {
    /// The general limit applied to every `/api` request.
    pub fn api(settings: &RateLimitSettings) -> Self {
        Self {
            window_size: Duration::seconds(settings.api_window_secs),
            max_requests: settings.api_max_requests,
        }
    }

    /// The stricter limit applied to travel searches.
    pub fn search(settings: &RateLimitSettings) -> Self {
        Self {
            window_size: Duration::seconds(settings.search_window_secs),
            max_requests: settings.search_max_requests,
        }
    }
}

#[derive(Debug)]
struct RequestWindow {
    timestamps: Vec<DateTime<Utc>>,
}

impl RequestWindow {
    fn new() -> Self {
        Self {
            timestamps: Vec::new(),
        }
    }

    fn cleanup_old_requests(&mut self, window_size: Duration) {
        let cutoff = Utc::now() - window_size;
        self.timestamps.retain(|ts| *ts > cutoff);
    }

    fn add_request(&mut self) {
        self.timestamps.push(Utc::now());
    }

    fn request_count(&self) -> usize {
        self.timestamps.len()
    }
}

/// Sliding-window limiter keyed by client (IP address or user id).
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, RequestWindow>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub async fn check_rate_limit(&self, key: &str) -> bool {
        let mut windows = self.windows.write().await;

        let window = windows.entry(key.to_string()).or_insert_with(RequestWindow::new);
        window.cleanup_old_requests(self.config.window_size);

        if window.request_count() < self.config.max_requests as usize {
            window.add_request();
            true
        } else {
            false
        }
    }

    pub async fn cleanup(&self) {
        let mut windows = self.windows.write().await;

        // Remove windows with no recent requests
        windows.retain(|_, window| {
            window.cleanup_old_requests(self.config.window_size);
            !window.timestamps.is_empty()
        });
    }

    pub async fn tracked_clients(&self) -> usize {
        self.windows.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration as TokioDuration};

    #[tokio::test]
    async fn test_rate_limiter() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_size: Duration::seconds(1),
            max_requests: 5,
        });

        for _ in 0..5 {
            assert!(limiter.check_rate_limit("10.0.0.1").await);
        }
        assert!(!limiter.check_rate_limit("10.0.0.1").await);

        // Other clients are unaffected
        assert!(limiter.check_rate_limit("10.0.0.2").await);

        sleep(TokioDuration::from_millis(1100)).await;

        assert!(limiter.check_rate_limit("10.0.0.1").await);
    }

    #[test]
    fn test_configs_from_settings() {
        let settings = crate::config::Settings::new_for_test().unwrap().rate_limit;
        let api = RateLimitConfig::api(&settings);
        assert_eq!(api.max_requests, 100);
        assert_eq!(api.window_size, Duration::minutes(15));

        let search = RateLimitConfig::search(&settings);
        assert_eq!(search.max_requests, 5);
        assert_eq!(search.window_size, Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_clients() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_size: Duration::milliseconds(200),
            max_requests: 1,
        });
        assert!(limiter.check_rate_limit("idle").await);
        assert_eq!(limiter.tracked_clients().await, 1);

        sleep(TokioDuration::from_millis(300)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_clients().await, 0);
    }
}
