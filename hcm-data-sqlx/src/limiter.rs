//! Per-table ingress limiter in front of the database.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// Refill tokens at `qps` per second up to `burst` and try to consume one.
#[inline]
fn refill_and_try_consume(bucket: &mut TokenBucket, qps: f64, burst: f64) -> bool {
    let now = Instant::now();
    let elapsed = now.duration_since(bucket.last_refill);
    bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * qps).min(burst);
    bucket.last_refill = now;

    if bucket.tokens >= 1.0 {
        bucket.tokens -= 1.0;
        true
    } else {
        false
    }
}

/// A token bucket per table name. Clones share buckets.
#[derive(Clone)]
pub struct IngressLimiter {
    buckets: Arc<DashMap<String, TokenBucket>>,
    qps: f64,
    burst: f64,
}

impl IngressLimiter {
    /// `qps` statements per second per table, with bursts of up to `burst`.
    /// A burst below 1 is raised to 1.
    pub fn new(qps: u32, burst: u32) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            qps: f64::from(qps),
            burst: f64::from(burst.max(1)),
        }
    }

    /// Try to admit one statement against `table`.
    pub fn try_acquire(&self, table: &str) -> bool {
        let burst = self.burst;
        let mut entry = self
            .buckets
            .entry(table.to_string())
            .or_insert_with(|| TokenBucket {
                tokens: burst,
                last_refill: Instant::now(),
            });
        refill_and_try_consume(entry.value_mut(), self.qps, self.burst)
    }
}

impl std::fmt::Debug for IngressLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngressLimiter")
            .field("qps", &self.qps)
            .field("burst", &self.burst)
            .finish()
    }
}
