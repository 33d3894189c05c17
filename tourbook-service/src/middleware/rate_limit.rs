//! Per-client rate limiting
//!
//! An in-memory keyed [`governor`] limiter mounted with
//! `axum::middleware::from_fn_with_state`. Each client gets a burst of
//! `max_requests`, refilled evenly over `window_secs`. Clients are keyed by
//! peer IP, falling back to the first `x-forwarded-for` hop when the server
//! was not started with connect info.

use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    Router,
};
use governor::{clock::Clock, DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::config::RateLimitConfig;
use crate::handlers::{ApiError, ErrorRenderer};

/// Response header carrying the per-window quota
pub const RATE_LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// Key shared by requests whose origin cannot be told apart
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limiting middleware state
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    limit: u32,
    window: Duration,
    message: Arc<str>,
    renderer: ErrorRenderer,
}

impl fmt::Debug for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimit")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RateLimit {
    /// Build the limiter, or `None` when limiting is disabled or the quota is empty.
    pub fn from_config(config: &RateLimitConfig, renderer: ErrorRenderer) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let quota = NonZeroU32::new(config.max_requests).and_then(|burst| {
            let replenish = config.window().checked_div(burst.get())?;
            Quota::with_period(replenish).map(|quota| quota.allow_burst(burst))
        });
        let Some(quota) = quota else {
            tracing::warn!(
                max_requests = config.max_requests,
                window_secs = config.window_secs,
                "unusable rate limit quota, rate limiting disabled"
            );
            return None;
        };

        Some(Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            limit: config.max_requests,
            window: config.window(),
            message: Arc::from(config.message.as_str()),
            renderer,
        })
    }

    /// Requests allowed per window
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Wrap every route of `router`.
    pub fn apply(self, router: Router) -> Router {
        router.layer(middleware::from_fn_with_state(self, Self::middleware))
    }

    /// Admit the request or answer 429 with a `Retry-After` header.
    pub async fn middleware(State(rate_limit): State<Self>, request: Request, next: Next) -> Response {
        let client = client_key(&request);
        match rate_limit.limiter.check_key(&client) {
            Ok(()) => {
                let mut response = next.run(request).await;
                rate_limit.add_limit_header(&mut response);
                response
            }
            Err(not_until) => {
                let wait = not_until.wait_time_from(rate_limit.limiter.clock().now());
                let retry_after = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                tracing::warn!(
                    client = %client,
                    limit = rate_limit.limit,
                    retry_after_secs = retry_after,
                    "rate limit exceeded"
                );

                let mut response = rate_limit.renderer.render(&ApiError::rate_limited(&*rate_limit.message));
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                rate_limit.add_limit_header(&mut response);
                response
            }
        }
    }

    fn add_limit_header(&self, response: &mut Response) {
        response
            .headers_mut()
            .insert(RATE_LIMIT_HEADER, HeaderValue::from(self.limit));
    }
}

/// The peer IP, else the first `x-forwarded-for` hop, else [`UNKNOWN_CLIENT`].
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::Environment;
    use axum::body::{to_bytes, Body};
    use axum::http::{self, StatusCode};
    use axum::routing::get;
    use serde_json::Value;
    use tower::ServiceExt;

    fn config(max_requests: u32) -> RateLimitConfig {
        RateLimitConfig {
            max_requests,
            ..RateLimitConfig::default()
        }
    }

    fn app(max_requests: u32) -> Router {
        let rate_limit = RateLimit::from_config(&config(max_requests), ErrorRenderer::new(Environment::Production))
            .unwrap();
        rate_limit.apply(Router::new().route("/tours", get(|| async { "ok" })))
    }

    fn from(ip: &str) -> Request {
        http::Request::builder()
            .uri("/tours")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_requests_over_quota_are_rejected() {
        let app = app(2);
        for _ in 0..2 {
            let response = app.clone().oneshot(from("203.0.113.7")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[RATE_LIMIT_HEADER], "2");
        }

        let response = app.oneshot(from("203.0.113.7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
        assert!(retry_after > 0 && retry_after <= 3600);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "too many requests from this IP. try in an hour...");
    }

    #[tokio::test]
    async fn test_clients_have_separate_quotas() {
        let app = app(1);
        let first = app.clone().oneshot(from("203.0.113.7")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let again = app.clone().oneshot(from("203.0.113.7, 10.0.0.1")).await.unwrap();
        assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);
        let other = app.oneshot(from("198.51.100.20")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[test]
    fn test_disabled_or_empty_quota_builds_nothing() {
        let renderer = ErrorRenderer::default();
        let disabled = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        assert!(RateLimit::from_config(&disabled, renderer).is_none());
        assert!(RateLimit::from_config(&config(0), renderer).is_none());

        let no_window = RateLimitConfig {
            window_secs: 0,
            ..RateLimitConfig::default()
        };
        assert!(RateLimit::from_config(&no_window, renderer).is_none());
        assert_eq!(RateLimit::from_config(&config(100), renderer).unwrap().limit(), 100);
    }

    #[test]
    fn test_client_key_sources() {
        let mut request = from(" 203.0.113.7 , 10.0.0.1");
        assert_eq!(client_key(&request), "203.0.113.7");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 52000))));
        assert_eq!(client_key(&request), "192.0.2.1");

        let bare = http::Request::builder().uri("/tours").body(Body::empty()).unwrap();
        assert_eq!(client_key(&bare), UNKNOWN_CLIENT);
    }
}
