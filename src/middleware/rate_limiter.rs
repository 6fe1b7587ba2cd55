use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue, RETRY_AFTER},
    Error, ResponseError,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::comm::client_ip::ClientIpResolver;
use crate::error::AppError;

/// 计数表超过该大小时顺带清理过期记录
const CLEANUP_THRESHOLD: usize = 10_000;

/// 限流配置
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 每个时间窗口允许的最大请求数
    pub max_requests: u32,
    /// 时间窗口大小（秒）
    pub window_size: u64,
    /// 是否启用限流
    pub enabled: bool,
    /// 需要限流的路径前缀
    pub protected_paths: Vec<String>,
    /// 是否在响应头中包含限流信息
    pub include_headers: bool,
    /// 客户端地址解析
    pub client_ip: ClientIpResolver,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_size: 15 * 60,
            enabled: true,
            protected_paths: vec!["/api/".to_string()],
            include_headers: true,
            client_ip: ClientIpResolver::default(),
        }
    }
}

impl RateLimitConfig {
    fn applies_to(&self, path: &str) -> bool {
        self.enabled && self.protected_paths.iter().any(|prefix| path.starts_with(prefix))
    }
}

/// 请求记录
#[derive(Debug, Clone)]
struct RequestRecord {
    count: u32,
    window_start: Instant,
}

impl RequestRecord {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }
}

/// 限流信息
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// 距离窗口重置的时间
    pub reset_after: Duration,
}

/// 固定窗口限流器，按客户端IP计数
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<Mutex<HashMap<String, RequestRecord>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 检查是否允许请求
    pub fn check_rate_limit(&self, client_ip: &str) -> RateLimitInfo {
        self.check_at(client_ip, Instant::now())
    }

    fn check_at(&self, client_ip: &str, now: Instant) -> RateLimitInfo {
        let window = Duration::from_secs(self.config.window_size);
        let mut store = self.store.lock();

        if store.len() > CLEANUP_THRESHOLD {
            retain_active(&mut store, now, window);
        }

        let record = store
            .entry(client_ip.to_string())
            .or_insert_with(|| RequestRecord::new(now));

        // 检查是否需要重置窗口
        if now.duration_since(record.window_start) >= window {
            record.count = 0;
            record.window_start = now;
        }

        let reset_after = (record.window_start + window).saturating_duration_since(now);

        if record.count >= self.config.max_requests {
            return RateLimitInfo {
                allowed: false,
                limit: self.config.max_requests,
                remaining: 0,
                reset_after,
            };
        }

        record.count += 1;
        RateLimitInfo {
            allowed: true,
            limit: self.config.max_requests,
            remaining: self.config.max_requests - record.count,
            reset_after,
        }
    }

    /// 清理过期记录
    pub fn cleanup_expired(&self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&self, now: Instant) {
        let window = Duration::from_secs(self.config.window_size);
        retain_active(&mut self.store.lock(), now, window);
    }

    /// 当前跟踪的客户端数量
    pub fn tracked_clients(&self) -> usize {
        self.store.lock().len()
    }
}

fn retain_active(store: &mut HashMap<String, RequestRecord>, now: Instant, window: Duration) {
    store.retain(|_, record| now.duration_since(record.window_start) < window);
}

fn insert_rate_limit_headers<B>(response: &mut ServiceResponse<B>, info: &RateLimitInfo) {
    let reset_at = chrono::Utc::now().timestamp() + info.reset_after.as_secs() as i64;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(info.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(info.remaining),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(reset_at),
    );
}

/// 限流中间件
pub struct RateLimitMiddleware {
    limiter: RateLimiter,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: RateLimiter::new(config),
        }
    }

    /// 复用已有的限流器，多个工作线程共享同一份计数
    pub fn with_limiter(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();

        Box::pin(async move {
            if !limiter.config().applies_to(req.path()) {
                return Ok(service.call(req).await?.map_into_boxed_body());
            }

            let client_ip = limiter.config().client_ip.resolve(req.request());
            debug!("限流检查: IP {} 访问 {}", client_ip, req.path());

            let info = limiter.check_rate_limit(&client_ip);
            if !info.allowed {
                warn!("限流拒绝: IP {} 超过限制", client_ip);

                let mut error_response = AppError::RateLimited.error_response();
                let retry_after = info.reset_after.as_secs().max(1);
                error_response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after));

                let mut response = req.into_response(error_response);
                if limiter.config().include_headers {
                    insert_rate_limit_headers(&mut response, &info);
                }
                return Ok(response);
            }

            debug!("限流通过: IP {} 剩余 {} 次请求", client_ip, info.remaining);
            let mut response = service.call(req).await?;
            if limiter.config().include_headers {
                insert_rate_limit_headers(&mut response, &info);
            }
            Ok(response.map_into_boxed_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use serde_json::Value;

    async fn test_handler() -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({"message": "success"}))
    }

    #[actix_web::test]
    async fn test_rate_limit_allows_requests_within_limit() {
        let config = RateLimitConfig {
            max_requests: 5,
            ..Default::default()
        };

        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(config))
                .route("/api/test", web::get().to(test_handler)),
        )
        .await;

        // 发送5个请求，都应该成功
        for i in 0..5u32 {
            let req = test::TestRequest::get().uri("/api/test").to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
            assert_eq!(
                resp.headers().get("x-ratelimit-remaining").unwrap(),
                &(4 - i).to_string()
            );
        }
    }

    #[actix_web::test]
    async fn test_rate_limit_blocks_excess_requests() {
        let config = RateLimitConfig {
            max_requests: 2,
            ..Default::default()
        };

        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(config))
                .route("/api/test", web::get().to(test_handler)),
        )
        .await;

        for _ in 0..2 {
            let req = test::TestRequest::get().uri("/api/test").to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }

        // 第3个请求应该被限流
        let req = test::TestRequest::get().uri("/api/test").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key(RETRY_AFTER));

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "请求过于频繁，请稍后再试");
    }

    #[actix_web::test]
    async fn test_paths_outside_api_are_not_limited() {
        let config = RateLimitConfig {
            max_requests: 1,
            ..Default::default()
        };

        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(config))
                .route("/status", web::get().to(test_handler)),
        )
        .await;

        for _ in 0..3 {
            let req = test::TestRequest::get().uri("/status").to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
            assert!(!resp.headers().contains_key("x-ratelimit-limit"));
        }
    }

    #[actix_web::test]
    async fn test_clients_are_counted_separately() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            ..Default::default()
        });

        assert!(limiter.check_rate_limit("192.168.1.1").allowed);
        assert!(!limiter.check_rate_limit("192.168.1.1").allowed);
        assert!(limiter.check_rate_limit("192.168.1.2").allowed);
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[std::prelude::v1::test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window_size: 60,
            ..Default::default()
        });
        let start = Instant::now();

        assert!(limiter.check_at("10.0.0.1", start).allowed);
        let blocked = limiter.check_at("10.0.0.1", start + Duration::from_secs(30));
        assert!(!blocked.allowed);
        assert_eq!(blocked.reset_after, Duration::from_secs(30));
        assert!(limiter.check_at("10.0.0.1", start + Duration::from_secs(60)).allowed);
    }

    #[std::prelude::v1::test]
    fn test_cleanup_drops_expired_windows() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_size: 60,
            ..Default::default()
        });
        let start = Instant::now();

        limiter.check_at("10.0.0.1", start);
        limiter.check_at("10.0.0.2", start + Duration::from_secs(45));
        assert_eq!(limiter.tracked_clients(), 2);

        limiter.cleanup_at(start + Duration::from_secs(61));
        assert_eq!(limiter.tracked_clients(), 1);

        limiter.cleanup_expired();
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[std::prelude::v1::test]
    fn test_disabled_limiter_skips_paths() {
        let config = RateLimitConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!config.applies_to("/api/stats"));
        assert!(RateLimitConfig::default().applies_to("/api/stats"));
        assert!(!RateLimitConfig::default().applies_to("/health"));
    }
}
