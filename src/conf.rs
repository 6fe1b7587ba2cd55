//! 应用配置
//!
//! 加载顺序（后者覆盖前者）：内置默认值、`config/default.*`、`config/{XD_ENV}.*`、
//! `XD__` 前缀的环境变量、`PORT` 环境变量，最后是命令行参数。

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::comm::client_ip::ClientIpResolver;
use crate::middleware::RateLimitConfig;

/// 配置目录
pub const CONFIG_DIR: &str = "config";
/// 选择环境配置文件的环境变量
pub const ENV_SELECTOR: &str = "XD_ENV";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置加载失败: {0}")]
    Load(#[from] config::ConfigError),

    #[error("配置项 {key} 无效: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// 不设置时使用 actix 默认的工作线程数
    #[serde(default)]
    pub workers: Option<usize>,
    /// 是否信任代理转发的客户端地址头
    pub trust_proxy: bool,
    /// JSON 请求体大小上限（字节）
    pub json_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    /// 是否输出 bunyan JSON 格式日志
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_secs: u64,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub rate_limit: RateLimitSettings,
}

impl AppSettings {
    /// 从默认位置加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var(ENV_SELECTOR).ok();
        let port = std::env::var("PORT").ok();
        Self::from_sources(CONFIG_DIR, environment.as_deref(), port.as_deref())
    }

    /// 按给定目录、环境名和端口覆盖值加载配置
    pub fn from_sources(
        config_dir: &str,
        environment: Option<&str>,
        port: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000i64)?
            .set_default("server.trust_proxy", false)?
            .set_default("server.json_limit", 100 * 1024i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", true)?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.max_requests", 100i64)?
            .set_default("rate_limit.window_secs", 15 * 60i64)?
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false));

        if let Some(env_name) = environment.filter(|name| !name.is_empty()) {
            builder = builder
                .add_source(File::with_name(&format!("{}/{}", config_dir, env_name)).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("XD")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::invalid("PORT", format!("无法解析端口 '{}'", port)))?;
            builder = builder.set_override("server.port", i64::from(port))?;
        }

        let settings: AppSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// 用命令行参数覆盖
    pub fn apply_overrides(
        &mut self,
        host: Option<String>,
        port: Option<u16>,
        workers: Option<usize>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        if let Some(workers) = workers {
            self.server.workers = Some(workers);
        }
        self.validate()
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::invalid("server.host", "不能为空"));
        }
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "必须在 1-65535 之间"));
        }
        if self.server.workers == Some(0) {
            return Err(ConfigError::invalid("server.workers", "必须大于 0"));
        }
        if self.server.json_limit == 0 {
            return Err(ConfigError::invalid("server.json_limit", "必须大于 0"));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::invalid("rate_limit.max_requests", "必须大于 0"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::invalid("rate_limit.window_secs", "必须大于 0"));
        }
        Ok(())
    }

    pub fn client_ip_resolver(&self) -> ClientIpResolver {
        ClientIpResolver::new(self.server.trust_proxy)
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit.max_requests,
            window_size: self.rate_limit.window_secs,
            enabled: self.rate_limit.enabled,
            client_ip: self.client_ip_resolver(),
            ..Default::default()
        }
    }

    /// 打印配置摘要
    pub fn print_config_summary(&self) {
        info!("=== 配置摘要 ===");
        info!("服务器: {}:{}", self.server.host, self.server.port);
        info!("工作线程: {:?}", self.server.workers);
        info!("信任代理: {}", self.server.trust_proxy);
        info!("日志级别: {}", self.logging.level);
        info!("JSON日志: {}", self.logging.json);
        if self.rate_limit.enabled {
            info!(
                "限流: {} 请求 / {} 秒",
                self.rate_limit.max_requests, self.rate_limit.window_secs
            );
        } else {
            info!("限流: 已关闭");
        }
    }
}
