use axum::{
    extract::{ConnectInfo, Request},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CONTENT_TYPE, RETRY_AFTER},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tokio::time::{MissedTickBehavior, interval};
use tracing::warn;

use wornshot_application::infrastructure_config::RateLimitConfig;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub requests: u32,
    pub window_start: Instant,
}

#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: Instant,
    pub retry_after_seconds: Option<u64>,
}

fn numeric_header(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or(HeaderValue::from_static("0"))
}

impl RateLimitInfo {
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("RateLimit-Limit", numeric_header(u64::from(self.limit)));
        headers.insert("RateLimit-Remaining", numeric_header(u64::from(self.remaining)));

        let time_until_reset = self.reset_time.saturating_duration_since(Instant::now());
        let reset_timestamp = (SystemTime::now() + time_until_reset)
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_secs();
        headers.insert("RateLimit-Reset", numeric_header(reset_timestamp));

        if let Some(retry_after) = self.retry_after_seconds {
            headers.insert(RETRY_AFTER, numeric_header(retry_after));
        }

        headers
    }
}

#[derive(Debug)]
pub enum RateLimitResult {
    Allowed(RateLimitInfo),
    Denied(RateLimitInfo),
}

/// Fixed one-minute window per client IP. A background task evicts idle
/// entries once a minute.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    pub store: Arc<DashMap<IpAddr, RateLimitEntry>>,
    pub requests_per_minute: u32,
    pub burst_size: u32,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, burst_size_multiplier: u32) -> Self {
        let burst_size = requests_per_minute.saturating_mul(burst_size_multiplier);
        let store = Arc::new(DashMap::new());

        let store_clone = Arc::clone(&store);
        tokio::spawn(async move {
            let mut cleanup_interval = interval(WINDOW);
            cleanup_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                cleanup_interval.tick().await;
                let now = Instant::now();
                store_clone.retain(|_, entry: &mut RateLimitEntry| {
                    now.duration_since(entry.window_start) < WINDOW
                });
            }
        });

        Self {
            store,
            requests_per_minute,
            burst_size,
        }
    }

    pub fn check_rate_limit(&self, ip: IpAddr) -> RateLimitResult {
        let now = Instant::now();

        let mut entry = self.store.entry(ip).or_insert_with(|| RateLimitEntry {
            requests: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= WINDOW {
            entry.window_start = now;
            entry.requests = 0;
        }

        let reset_time = entry.window_start + WINDOW;

        if entry.requests < self.burst_size {
            entry.requests += 1;

            RateLimitResult::Allowed(RateLimitInfo {
                limit: self.burst_size,
                remaining: self.burst_size.saturating_sub(entry.requests),
                reset_time,
                retry_after_seconds: None,
            })
        } else {
            RateLimitResult::Denied(RateLimitInfo {
                limit: self.burst_size,
                remaining: 0,
                reset_time,
                retry_after_seconds: Some(reset_time.saturating_duration_since(now).as_secs()),
            })
        }
    }
}

fn merge_headers_safe(target: &mut HeaderMap, source: &HeaderMap) {
    for (key, value) in source {
        if !target.contains_key(key) {
            target.insert(key, value.clone());
        }
    }
}

/// Requests served without connection info (in-process test servers) share
/// a single bucket.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| addr.ip())
}

pub async fn rate_limit_middleware(
    rate_limiter: Arc<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = client_ip(&request);

    match rate_limiter.check_rate_limit(client_ip) {
        RateLimitResult::Allowed(rate_info) => {
            let mut response = next.run(request).await;
            merge_headers_safe(response.headers_mut(), &rate_info.to_headers());
            response
        }
        RateLimitResult::Denied(rate_info) => {
            warn!(
                client_ip = %client_ip,
                method = %request.method(),
                uri = %request.uri(),
                "Rate limit exceeded"
            );

            let mut headers = rate_info.to_headers();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

            (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                "Rate limit exceeded",
            )
                .into_response()
        }
    }
}

pub fn create_credits_rate_limiter(config: &RateLimitConfig) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(
        config.credits_requests_per_minute,
        config.burst_size_multiplier,
    ))
}

pub fn create_generation_rate_limiter(config: &RateLimitConfig) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(
        config.generation_requests_per_minute,
        config.burst_size_multiplier,
    ))
}

pub fn create_auth_rate_limiter(config: &RateLimitConfig) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(
        config.auth_requests_per_minute,
        config.burst_size_multiplier,
    ))
}

pub fn create_general_rate_limiter(config: &RateLimitConfig) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(
        config.global_requests_per_minute,
        config.burst_size_multiplier,
    ))
}
