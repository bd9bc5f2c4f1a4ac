// web-server/src/middleware/rate_limiter.rs
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    Error, HttpResponse, ResponseError,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use questline_common::RateLimitConfig;
use serde_json::json;

#[derive(Debug)]
struct RateLimitExceeded {
    retry_after: u64,
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limit exceeded")
    }
}

impl ResponseError for RateLimitExceeded {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, self.retry_after.to_string()))
            .json(json!({
                "error": "rate_limited",
                "reason": "Rate limit exceeded. Please try again later.",
            }))
    }
}

/// Sliding-window limit on POSTs to the configured path prefixes, per client IP.
///
/// Clients are keyed by the TCP peer address unless forwarded headers are
/// explicitly trusted, since any client can set those.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_requests: usize,
    window: Duration,
    trust_forwarded_headers: bool,
    store: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, max_requests: usize, window: Duration) -> Self {
        Self {
            paths,
            max_requests,
            window,
            trust_forwarded_headers: false,
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.paths.clone(),
            config.max_requests,
            Duration::from_secs(config.window_secs),
        )
        .trust_forwarded_headers(config.trust_forwarded_headers)
    }

    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }

    fn client_key(&self, req: &ServiceRequest) -> String {
        if self.trust_forwarded_headers {
            req.connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string()
        } else {
            req.peer_addr()
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        }
    }

    fn applies_to(&self, method: &Method, path: &str) -> bool {
        *method == Method::POST && self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    fn is_rate_limited(&self, ip: &str, now: Instant) -> bool {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);

        // Drop clients with no requests left in the window
        store.retain(|_, hits| hits.iter().any(|t| now.duration_since(*t) < self.window));

        let hits = store.entry(ip.to_string()).or_default();
        hits.retain(|t| now.duration_since(*t) < self.window);

        if hits.len() >= self.max_requests {
            true
        } else {
            hits.push(now);
            false
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.limiter.applies_to(req.method(), req.path()) {
            let ip = self.limiter.client_key(&req);

            if self.limiter.is_rate_limited(&ip, Instant::now()) {
                tracing::warn!("Rate limit exceeded for IP: {}", ip);
                let retry_after = self.limiter.window.as_secs().max(1);
                return Box::pin(async move { Err(RateLimitExceeded { retry_after }.into()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    #[::core::prelude::v1::test]
    fn test_window_limits_per_ip() {
        let limiter = RateLimiter::new(vec!["/api/users".into()], 2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(!limiter.is_rate_limited("1.1.1.1", start));
        assert!(!limiter.is_rate_limited("1.1.1.1", start));
        assert!(limiter.is_rate_limited("1.1.1.1", start));
        assert!(!limiter.is_rate_limited("2.2.2.2", start));

        let later = start + Duration::from_secs(61);
        assert!(!limiter.is_rate_limited("1.1.1.1", later));
    }

    #[::core::prelude::v1::test]
    fn test_only_posts_to_listed_paths() {
        let limiter = RateLimiter::new(vec!["/api/users".into()], 1, Duration::from_secs(60));
        assert!(limiter.applies_to(&Method::POST, "/api/users"));
        assert!(!limiter.applies_to(&Method::GET, "/api/users/42"));
        assert!(!limiter.applies_to(&Method::POST, "/api/quests"));
    }

    #[actix_web::test]
    async fn test_middleware_returns_429() {
        let limiter = RateLimiter::new(vec!["/api/users".into()], 1, Duration::from_secs(30));
        let app = test::init_service(
            App::new()
                .wrap(limiter)
                .route("/api/users", web::post().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/users")
            .peer_addr("10.0.0.1:4000".parse().unwrap())
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/users")
            .peer_addr("10.0.0.1:4000".parse().unwrap())
            .to_request();
        let resp = test::try_call_service(&app, req).await;
        let err = match resp {
            Ok(resp) => panic!("expected rate limit, got {}", resp.status()),
            Err(err) => err,
        };
        let resp = err.error_response();
        assert_eq!(resp.status().as_u16(), 429);
        assert_eq!(resp.headers().get(header::RETRY_AFTER).unwrap(), "30");
    }

    macro_rules! post_from {
        ($app:expr, $forwarded_for:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/users")
                .peer_addr("10.0.0.1:4000".parse().unwrap())
                .insert_header(("x-forwarded-for", $forwarded_for))
                .to_request();
            test::try_call_service(&$app, req).await.is_ok()
        }};
    }

    #[actix_web::test]
    async fn test_forwarded_header_ignored_by_default() {
        let limiter = RateLimiter::new(vec!["/api/users".into()], 1, Duration::from_secs(30));
        let app = test::init_service(
            App::new()
                .wrap(limiter)
                .route("/api/users", web::post().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        assert!(post_from!(app, "1.1.1.1"));
        assert!(!post_from!(app, "2.2.2.2"));
    }

    #[actix_web::test]
    async fn test_forwarded_header_used_when_trusted() {
        let limiter = RateLimiter::new(vec!["/api/users".into()], 1, Duration::from_secs(30))
            .trust_forwarded_headers(true);
        let app = test::init_service(
            App::new()
                .wrap(limiter)
                .route("/api/users", web::post().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        assert!(post_from!(app, "1.1.1.1"));
        assert!(post_from!(app, "2.2.2.2"));
        assert!(!post_from!(app, "1.1.1.1"));
    }
}
