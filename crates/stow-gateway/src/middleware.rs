//! HTTP middleware: content negotiation, rate limiting, request logging

use crate::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// The representations this API can produce. Negotiated once per
/// request and attached as an extension for handlers to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    Json,
    Html,
}

impl Offer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Html => "text/html",
        }
    }
}

/// Content negotiation middleware. A request that accepts neither JSON
/// nor HTML is refused up front with 406.
pub async fn accept_middleware(mut request: Request<Body>, next: Next) -> Response {
    let accept = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());
    let Some(offer) = accept.and_then(negotiate) else {
        return ApiError::status(
            StatusCode::NOT_ACCEPTABLE,
            "supported media types are application/json and text/html",
        )
        .into_response();
    };
    request.extensions_mut().insert(offer);
    next.run(request).await
}

/// Pick the first supported media type out of the Accept header. The
/// offer list is two entries long, so q-value ordering is not worth
/// the parse.
fn negotiate(accept: &str) -> Option<Offer> {
    for part in accept.split(',') {
        let media_type = part.split(';').next().unwrap_or_default().trim();
        match media_type {
            "*/*" | "application/json" => return Some(Offer::Json),
            "text/html" => return Some(Offer::Html),
            _ => {}
        }
    }
    None
}

/// Process-wide request limiter with state snapshots for the
/// RateLimit response headers.
pub struct GatewayLimiter {
    inner: RateLimiter<NotKeyed, InMemoryState, DefaultClock, StateInformationMiddleware>,
    clock: DefaultClock,
    burst: u32,
    interval: Duration,
}

/// Create the request limiter: `burst` tokens of capacity, one token
/// refilled per `interval`.
pub fn create_rate_limiter(burst: u32, interval: Duration) -> Arc<GatewayLimiter> {
    let burst = NonZeroU32::new(burst.max(1)).unwrap();
    let interval = interval.max(Duration::from_millis(1));
    let quota = Quota::with_period(interval).unwrap().allow_burst(burst);
    Arc::new(GatewayLimiter {
        inner: RateLimiter::direct(quota).with_middleware::<StateInformationMiddleware>(),
        clock: DefaultClock::default(),
        burst: burst.get(),
        interval,
    })
}

const LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Rate limiting middleware. Every response carries the limiter state
/// headers, throttled ones included.
///
/// On allowed requests the reset header reports the full refill
/// interval, an upper bound on the wait for the next token (the
/// snapshot does not expose the exact refill instant). Throttled
/// responses report the actual wait.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<GatewayLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match limiter.inner.check() {
        Ok(snapshot) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(LIMIT, HeaderValue::from(snapshot.quota().burst_size().get()));
            headers.insert(REMAINING, HeaderValue::from(snapshot.remaining_burst_capacity()));
            headers.insert(RESET, HeaderValue::from(reset_secs(limiter.interval)));
            response
        }
        Err(denied) => {
            let wait = denied.wait_time_from(limiter.clock.now());
            let mut response = ApiError::status(
                StatusCode::TOO_MANY_REQUESTS,
                "too many requests, please try again later",
            )
            .into_response();
            let headers = response.headers_mut();
            headers.insert(LIMIT, HeaderValue::from(limiter.burst));
            headers.insert(REMAINING, HeaderValue::from(0u32));
            headers.insert(RESET, HeaderValue::from(reset_secs(wait)));
            response
        }
    }
}

/// Whole seconds until another token is available, rounded up so a
/// client never retries early.
fn reset_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

/// Logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "request completed"
    );

    response
}
