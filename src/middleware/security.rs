use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

/// 默认内容安全策略
pub const DEFAULT_CONTENT_SECURITY_POLICY: &str = "default-src 'self';base-uri 'self';font-src 'self' https: data:;form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests";

/// 安全配置
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// 启用安全头
    pub enable_security_headers: bool,
    pub content_security_policy: String,
    /// HSTS 有效期（秒）
    pub hsts_max_age: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_security_headers: true,
            content_security_policy: DEFAULT_CONTENT_SECURITY_POLICY.to_string(),
            hsts_max_age: 15_552_000, // 180天
        }
    }
}

impl SecurityConfig {
    /// 生成需要写入响应的安全头
    fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = Vec::with_capacity(12);

        if let Ok(csp) = HeaderValue::from_str(&self.content_security_policy) {
            headers.push((HeaderName::from_static("content-security-policy"), csp));
        }
        if let Ok(hsts) =
            HeaderValue::from_str(&format!("max-age={}; includeSubDomains", self.hsts_max_age))
        {
            headers.push((HeaderName::from_static("strict-transport-security"), hsts));
        }

        let fixed = [
            ("cross-origin-opener-policy", "same-origin"),
            ("cross-origin-resource-policy", "same-origin"),
            ("origin-agent-cluster", "?1"),
            ("referrer-policy", "no-referrer"),
            ("x-content-type-options", "nosniff"),
            ("x-dns-prefetch-control", "off"),
            ("x-download-options", "noopen"),
            ("x-frame-options", "SAMEORIGIN"),
            ("x-permitted-cross-domain-policies", "none"),
            ("x-xss-protection", "0"),
        ];
        headers.extend(
            fixed
                .into_iter()
                .map(|(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value))),
        );

        headers
    }
}

/// 安全头中间件
pub struct SecurityMiddleware {
    config: SecurityConfig,
}

impl SecurityMiddleware {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SecurityMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let headers = if self.config.enable_security_headers {
            self.config.headers()
        } else {
            Vec::new()
        };

        ready(Ok(SecurityMiddlewareService {
            service: Rc::new(service),
            headers: Rc::new(headers),
        }))
    }
}

pub struct SecurityMiddlewareService<S> {
    service: Rc<S>,
    headers: Rc<Vec<(HeaderName, HeaderValue)>>,
}

impl<S, B> Service<ServiceRequest> for SecurityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let headers = self.headers.clone();

        Box::pin(async move {
            let mut response = service.call(req).await?;

            let response_headers = response.headers_mut();
            for (name, value) in headers.iter() {
                response_headers.insert(name.clone(), value.clone());
            }

            Ok(response)
        })
    }
}
