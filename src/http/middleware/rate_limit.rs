//! Per-client rate limiting.
//!
//! # Design Decisions
//! - Fixed window counter per client key, stored in a `DashMap`
//! - Increment and compare happen under the entry's shard lock
//! - Expired windows reset lazily when their client returns
//! - Idle clients are swept at most once per window, inline with a request;
//!   nothing is scheduled in the background, so dropping the limiter drops
//!   all state

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::context::Context;
use crate::http::handler::Handler;
use crate::http::middleware::{from_fn, Middleware};
use crate::observability::metrics;

/// Extracts the client identifier a request is counted under.
pub type KeyExtractor = Arc<dyn Fn(&Context) -> String + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Shared counter state for the rate limiting middleware.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Count a request from `key` now.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Count a request from `key` at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        self.maybe_sweep(now);

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        let window = entry.value_mut();

        if now.saturating_duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        if window.count >= self.max_requests {
            let retry_after = self.window.saturating_sub(now.saturating_duration_since(window.started));
            return Decision::Limited { retry_after };
        }

        window.count += 1;
        Decision::Allowed {
            remaining: self.max_requests - window.count,
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Drop every window that has fully elapsed.
    pub fn evict_expired(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }

    fn maybe_sweep(&self, now: Instant) {
        // Another request already sweeping is as good as sweeping ourselves.
        let Ok(mut last) = self.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last) < self.window {
            return;
        }
        *last = now;
        drop(last);
        self.evict_expired(now);
    }
}

/// Key requests by peer IP; `"unknown"` when the transport gave no address.
pub fn peer_ip_key() -> KeyExtractor {
    Arc::new(|ctx: &Context| {
        ctx.client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    })
}

/// Key requests by the first `X-Forwarded-For` hop, falling back to the
/// peer IP. Only sound behind a proxy that overwrites the header.
pub fn forwarded_for_key() -> KeyExtractor {
    let fallback = peer_ip_key();
    Arc::new(move |ctx: &Context| {
        ctx.header("x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| fallback(ctx))
    })
}

/// Build the middleware. Requests over the limit get 429 with `Retry-After`
/// and never reach the inner chain.
pub fn rate_limiter(limiter: Arc<RateLimiter>, key: KeyExtractor) -> Middleware {
    from_fn(move |mut ctx: Context, next: Handler| {
        let limiter = limiter.clone();
        let client = key(&ctx);
        async move {
            match limiter.check(&client) {
                Decision::Allowed { .. } => next(ctx).await,
                Decision::Limited { retry_after } => {
                    tracing::warn!(client = %client, path = %ctx.path(), "Rate limit exceeded");
                    metrics::record_rate_limited();
                    let secs = (retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0)).max(1);
                    ctx.set_header(header::RETRY_AFTER, HeaderValue::from(secs));
                    ctx.string(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
                    ctx
                }
            }
        }
    })
}
