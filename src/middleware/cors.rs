use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{self, HeaderValue},
        Method,
    },
    Error, HttpResponse,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use tracing::debug;

/// 跨域配置
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// 允许的来源，`*` 表示任意来源
    pub allowed_origin: String,
    pub allowed_methods: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "*".to_string(),
            allowed_methods: "GET,HEAD,PUT,PATCH,POST,DELETE".to_string(),
        }
    }
}

/// 跨域中间件
///
/// 所有响应都带上 Access-Control-Allow-Origin；OPTIONS 预检请求直接返回 204。
pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// 宽松默认值：任意来源
    pub fn permissive() -> Self {
        Self::new(CorsConfig::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for CorsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = CorsMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorsMiddlewareService {
            service: Rc::new(service),
            config: Rc::new(self.config.clone()),
        }))
    }
}

pub struct CorsMiddlewareService<S> {
    service: Rc<S>,
    config: Rc<CorsConfig>,
}

impl<S, B> Service<ServiceRequest> for CorsMiddlewareService<S>
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
        let config = self.config.clone();

        Box::pin(async move {
            let allow_origin = HeaderValue::from_str(&config.allowed_origin)
                .unwrap_or_else(|_| HeaderValue::from_static("*"));

            if *req.method() == Method::OPTIONS {
                debug!("CORS 预检: {}", req.path());

                let mut preflight = HttpResponse::NoContent();
                preflight
                    .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin))
                    .insert_header((
                        header::ACCESS_CONTROL_ALLOW_METHODS,
                        config.allowed_methods.as_str(),
                    ));

                // 回显客户端请求的头部
                if let Some(requested) = req.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
                    preflight
                        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone()))
                        .insert_header((header::VARY, "Access-Control-Request-Headers"));
                }

                return Ok(req.into_response(preflight.finish()));
            }

            let mut response = service.call(req).await?;
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);

            Ok(response.map_into_boxed_body())
        })
    }
}
