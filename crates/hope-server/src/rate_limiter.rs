// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-key token buckets. Used to throttle OTP sends per phone number.
pub(crate) struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    cfg: RateLimitConfig,
}

impl RateLimiter {
    pub(crate) fn new(cfg: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            cfg,
        }
    }

    pub(crate) async fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now()).await
    }

    async fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut lock = self.buckets.lock().await;
        // Full buckets carry no information; drop them so the map stays small.
        let cfg = &self.cfg;
        lock.retain(|_, b| {
            let elapsed = now.saturating_duration_since(b.last_refill).as_secs_f64();
            b.tokens + elapsed * cfg.refill_per_sec < cfg.capacity
        });
        let bucket = lock.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: cfg.capacity,
            last_refill: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + (elapsed * cfg.refill_per_sec)).min(cfg.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
