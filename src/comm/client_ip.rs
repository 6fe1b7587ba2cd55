use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use std::convert::Infallible;

/// 客户端地址解析
///
/// 默认只使用 TCP 对端地址；部署在反向代理之后时开启 `trust_proxy`，
/// 依次读取 X-Forwarded-For、X-Real-IP、Forwarded 头部。
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpResolver {
    pub trust_proxy: bool,
}

impl ClientIpResolver {
    pub fn new(trust_proxy: bool) -> Self {
        Self { trust_proxy }
    }

    /// 获取客户端IP地址
    pub fn resolve(&self, req: &HttpRequest) -> String {
        if self.trust_proxy {
            if let Some(ip) = Self::from_proxy_headers(req) {
                return ip;
            }
        }

        // 回退到连接信息
        req.peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn from_proxy_headers(req: &HttpRequest) -> Option<String> {
        let headers = req.headers();

        if let Some(forwarded_for) = headers.get("X-Forwarded-For").and_then(|v| v.to_str().ok()) {
            if let Some(first_ip) = forwarded_for.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }

        if let Some(real_ip) = headers.get("X-Real-IP").and_then(|v| v.to_str().ok()) {
            return Some(real_ip.trim().to_string());
        }

        // 解析 Forwarded 头部格式: for=192.0.2.60;proto=http;by=203.0.113.43
        if let Some(forwarded) = headers.get("Forwarded").and_then(|v| v.to_str().ok()) {
            for part in forwarded.split(';') {
                if let Some(ip) = part.trim().strip_prefix("for=") {
                    return Some(ip.trim_matches('"').to_string());
                }
            }
        }

        None
    }
}

/// 请求的客户端IP，解析规则取自应用数据中的 [`ClientIpResolver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequest for ClientIp {
    type Error = Infallible;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let resolver = req
            .app_data::<web::Data<ClientIpResolver>>()
            .map(|data| *data.get_ref())
            .unwrap_or_default();
        ready(Ok(ClientIp(resolver.resolve(req))))
    }
}
