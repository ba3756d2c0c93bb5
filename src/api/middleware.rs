//! Request middleware: API key check, rate limiting, idempotency key echo
//! and error path stamping.
//!
//! Layer order (outermost first) as wired in [`crate::api::build_router`]:
//! `stamp_error_path` → `require_api_key` → `rate_limit` → `idempotency_key`.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use crate::app_state::AppState;
use crate::error::{ApiError, ErrorBody};

/// Header echoed on mutating requests.
pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// Paths that bypass authentication and rate limiting.
fn is_exempt(path: &str) -> bool {
    path == "/health" || path.starts_with("/swagger-ui") || path.starts_with("/api-docs")
}

/// Rejects requests without the configured API key.
///
/// A no-op when no key is configured. Missing or empty header → 401,
/// wrong value → 403.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        return next.run(req).await;
    };
    if is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    let provided = req
        .headers()
        .get(state.config.api_key_header.as_str())
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    match provided {
        None => {
            tracing::warn!(path = %req.uri().path(), "request without api key");
            ApiError::Unauthorized("API Key não fornecida".to_string()).into_response()
        }
        Some(key) if key != expected => {
            tracing::warn!(path = %req.uri().path(), "invalid api key");
            ApiError::Forbidden("API Key inválida".to_string()).into_response()
        }
        Some(_) => next.run(req).await,
    }
}

/// Fixed-window request counter shared by every resource route.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    current: Mutex<Window>,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_requests` per `window`.
    /// `max_requests == 0` disables limiting.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            current: Mutex::new(Window {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Counts one request against the current window.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RateLimited`] once the window is exhausted.
    pub async fn try_acquire(&self) -> Result<(), ApiError> {
        if self.max_requests == 0 {
            return Ok(());
        }
        let mut current = self.current.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(current.started);
        if elapsed >= self.window {
            current.started = now;
            current.count = 0;
        }
        if current.count >= self.max_requests {
            let remaining = self.window.saturating_sub(now.duration_since(current.started));
            return Err(ApiError::RateLimited {
                retry_after_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
            });
        }
        current.count += 1;
        Ok(())
    }
}

/// Applies the shared [`RateLimiter`]; `/health` is not counted.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if is_exempt(req.uri().path()) {
        return next.run(req).await;
    }
    match state.rate_limiter.try_acquire().await {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::warn!(path = %req.uri().path(), "rate limit exceeded");
            err.into_response()
        }
    }
}

/// Echoes `Idempotency-Key` on POST, PUT, PATCH and DELETE, generating a
/// UUID v4 when the client sent none. Keys are not used for deduplication.
pub async fn idempotency_key(req: Request, next: Next) -> Response {
    let mutating = matches!(
        *req.method(),
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );
    if !mutating {
        return next.run(req).await;
    }

    let key = req
        .headers()
        .get(IDEMPOTENCY_KEY)
        .filter(|v| !v.is_empty())
        .cloned()
        .or_else(|| HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()).ok());

    let mut response = next.run(req).await;
    if let Some(key) = key {
        response
            .headers_mut()
            .insert(HeaderName::from_static(IDEMPOTENCY_KEY), key);
    }
    response
}

/// Rewrites error bodies produced by [`ApiError`] so `path` holds the
/// request path.
pub async fn stamp_error_path(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let mut response = next.run(req).await;

    let Some(mut body) = response.extensions_mut().remove::<ErrorBody>() else {
        return response;
    };
    body.path = path;

    let (mut parts, original) = response.into_parts();
    match serde_json::to_vec(&body) {
        Ok(bytes) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(_) => Response::from_parts(parts, original),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limiter_rejects_after_max_requests() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.try_acquire().await.is_ok());
        assert!(limiter.try_acquire().await.is_ok());

        let Err(ApiError::RateLimited { retry_after_ms }) = limiter.try_acquire().await else {
            panic!("expected RateLimited");
        };
        assert!(retry_after_ms <= 60_000);
    }

    #[tokio::test]
    async fn limiter_resets_after_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(30));
        assert!(limiter.try_acquire().await.is_ok());
        assert!(limiter.try_acquire().await.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(limiter.try_acquire().await.is_ok());
    }

    #[tokio::test]
    async fn zero_disables_limit() {
        let limiter = RateLimiter::new(0, Duration::from_millis(1));
        for _ in 0..100 {
            assert!(limiter.try_acquire().await.is_ok());
        }
    }

    #[test]
    fn health_and_docs_are_exempt() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/swagger-ui/index.html"));
        assert!(is_exempt("/api-docs/openapi.json"));
        assert!(!is_exempt("/escolas"));
    }
}
