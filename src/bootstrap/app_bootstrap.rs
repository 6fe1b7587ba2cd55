use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::Logger,
    rt, web, App, Error, HttpServer,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::api::health::Uptime;
use crate::command_registry::APP_NAME;
use crate::conf::{AppSettings, LoggingSettings};
use crate::error::{AppError, AppResult};
use crate::middleware::{
    CorsMiddleware, RateLimitMiddleware, RateLimiter, SecurityConfig, SecurityMiddleware,
};
use crate::modules::reservation::ReservationStore;
use crate::route_registry::{configure_global_routes, not_found, RouteRegistry};

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的日志级别；actix 的 `log` 记录会转发到 tracing。
pub fn init_tracing(settings: &LoggingSettings) -> AppResult<()> {
    LogTracer::init().map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let result = if settings.json {
        let formatting_layer = BunyanFormattingLayer::new(APP_NAME.into(), std::io::stdout);
        let subscriber = Registry::default()
            .with(env_filter)
            .with(JsonStorageLayer)
            .with(formatting_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer());
        tracing::subscriber::set_global_default(subscriber)
    };

    result.map_err(|e| AppError::Internal(anyhow::Error::new(e)))
}

/// 所有工作线程共享的状态
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReservationStore>,
    pub uptime: Uptime,
    pub rate_limiter: RateLimiter,
    pub settings: AppSettings,
}

impl AppState {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            store: Arc::new(ReservationStore::new()),
            uptime: Uptime::start(),
            rate_limiter: RateLimiter::new(settings.rate_limit_config()),
            settings,
        }
    }
}

/// 构建应用：注入状态、挂载中间件与路由
///
/// 中间件从外到内依次是请求日志、安全头、跨域、限流。
/// 请求体由 [`crate::comm::JsonBody`] 解析，大小上限来自 `server.json_limit`。
pub fn build_app(
    state: &AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state.store.clone()))
        .app_data(web::Data::new(state.uptime))
        .app_data(web::Data::new(state.settings.client_ip_resolver()))
        .app_data(web::PayloadConfig::new(state.settings.server.json_limit))
        .wrap(RateLimitMiddleware::with_limiter(state.rate_limiter.clone()))
        .wrap(CorsMiddleware::permissive())
        .wrap(SecurityMiddleware::new(SecurityConfig::default()))
        .wrap(Logger::default())
        .configure(configure_global_routes)
        .default_service(web::route().to(not_found))
}

/// 按窗口周期清理过期的限流记录
fn spawn_rate_limit_cleanup(limiter: RateLimiter, period: Duration) {
    rt::spawn(async move {
        let mut ticker = rt::time::interval(period);
        loop {
            ticker.tick().await;
            limiter.cleanup_expired();
            debug!("限流记录清理完成，剩余 {} 个客户端", limiter.tracked_clients());
        }
    });
}

/// 应用启动器
pub struct AppBootstrap {
    settings: AppSettings,
}

impl AppBootstrap {
    pub fn new(settings: AppSettings) -> Self {
        Self { settings }
    }

    /// 运行应用服务器
    #[instrument(skip(self))]
    pub async fn run(self) -> AppResult<()> {
        let state = AppState::new(self.settings.clone());
        spawn_rate_limit_cleanup(
            state.rate_limiter.clone(),
            Duration::from_secs(self.settings.rate_limit.window_secs),
        );
        let host = self.settings.server.host.clone();
        let port = self.settings.server.port;

        RouteRegistry::with_default_routes().print_routes_info();

        let mut server = HttpServer::new(move || build_app(&state));
        if let Some(workers) = self.settings.server.workers {
            server = server.workers(workers);
        }

        let server = server
            .bind((host.as_str(), port))
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

        info!("🚀 服务器运行在 http://{}:{}", host, port);
        info!("📊 统计接口: http://{}:{}/api/stats", host, port);
        info!("❤️  健康检查: http://{}:{}/api/health", host, port);

        server.run().await.map_err(|e| {
            error!("服务器运行失败: {}", e);
            AppError::Internal(anyhow::Error::new(e))
        })
    }
}
