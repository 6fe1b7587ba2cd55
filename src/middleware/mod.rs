/// 传输层中间件：安全头、跨域、限流
pub mod cors;
pub mod rate_limiter;
pub mod security;

pub use cors::{CorsConfig, CorsMiddleware};
pub use rate_limiter::{RateLimitConfig, RateLimitMiddleware, RateLimiter};
pub use security::{SecurityConfig, SecurityMiddleware};
