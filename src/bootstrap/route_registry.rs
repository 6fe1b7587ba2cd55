use actix_web::web;
use tracing::info;

use crate::error::AppError;

/// 路由配置函数类型
pub type RouteConfigFn = fn(&mut web::ServiceConfig);

/// 路由信息结构
#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub name: String,
    pub description: String,
    pub module: String,
    pub config_fn: RouteConfigFn,
}

impl RouteInfo {
    pub fn new(name: &str, description: &str, module: &str, config_fn: RouteConfigFn) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            module: module.to_string(),
            config_fn,
        }
    }
}

/// 路由注册器，按注册顺序配置
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Vec<RouteInfo>,
}

impl RouteRegistry {
    /// 创建新的路由注册器
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含全部业务模块的注册器
    pub fn with_default_routes() -> Self {
        let mut registry = Self::new();
        registry.register_route(RouteInfo::new(
            "health",
            "健康检查",
            "api",
            crate::api::health::register,
        ));
        registry.register_route(RouteInfo::new(
            "reservations",
            "创建预约、查询预约与统计",
            "reservation",
            crate::modules::reservation::routes::register,
        ));
        registry.register_route(RouteInfo::new(
            "analytics",
            "分析事件追踪",
            "analytics",
            crate::modules::analytics::routes::register,
        ));
        registry
    }

    /// 注册路由，同名路由会被替换
    pub fn register_route(&mut self, route_info: RouteInfo) {
        self.routes.retain(|route| route.name != route_info.name);
        self.routes.push(route_info);
    }

    /// 获取所有路由
    pub fn get_routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// 获取指定模块的路由
    pub fn get_routes_by_module(&self, module: &str) -> Vec<&RouteInfo> {
        self.routes
            .iter()
            .filter(|route| route.module == module)
            .collect()
    }

    /// 配置所有路由到 ServiceConfig
    pub fn configure_all_routes(&self, cfg: &mut web::ServiceConfig) {
        for route_info in &self.routes {
            (route_info.config_fn)(cfg);
        }
    }

    /// 打印路由信息
    pub fn print_routes_info(&self) {
        info!("路由注册信息:");
        for route in &self.routes {
            info!("  - [{}] {}: {}", route.module, route.name, route.description);
        }
        info!("总计: {} 组路由", self.routes.len());
    }
}

/// 配置所有业务路由
pub fn configure_global_routes(cfg: &mut web::ServiceConfig) {
    RouteRegistry::with_default_routes().configure_all_routes(cfg);
}

/// 未匹配路由
pub async fn not_found() -> Result<actix_web::HttpResponse, AppError> {
    Err(AppError::RouteNotFound)
}
