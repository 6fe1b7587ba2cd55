use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::conf::ConfigError;
use crate::modules::reservation::models::FieldError;
use crate::modules::reservation::store::ReservationError;

/// 创建预约时的通用错误提示
pub const CREATION_FAILED_MESSAGE: &str = "服务器错误，请稍后重试";
/// 兜底错误提示
pub const INTERNAL_ERROR_MESSAGE: &str = "服务器内部错误";
/// 未匹配路由提示
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "接口不存在";
/// 预约不存在提示
pub const RESERVATION_NOT_FOUND_MESSAGE: &str = "预约不存在";
/// 手机号重复提示
pub const DUPLICATE_PHONE_MESSAGE: &str = "该手机号已预约";
/// 限流提示
pub const RATE_LIMITED_MESSAGE: &str = "请求过于频繁，请稍后再试";

/// 统一的应用错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("验证错误: {} 个字段不合法", .0.len())]
    Validation(Vec<FieldError>),

    #[error("{}", DUPLICATE_PHONE_MESSAGE)]
    Duplicate,

    #[error("资源未找到: {message}")]
    NotFound { message: String },

    #[error("{}", ROUTE_NOT_FOUND_MESSAGE)]
    RouteNotFound,

    #[error("{}", RATE_LIMITED_MESSAGE)]
    RateLimited,

    #[error("创建预约失败: {0}")]
    Creation(anyhow::Error),

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// 创建资源未找到错误
    pub fn not_found<T: Into<String>>(message: T) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// 返回给客户端的错误信息，内部细节不会外泄
    pub fn client_message(&self) -> String {
        match self {
            AppError::Validation(_) => String::new(),
            AppError::Duplicate => DUPLICATE_PHONE_MESSAGE.to_string(),
            AppError::NotFound { message } => message.clone(),
            AppError::RouteNotFound => ROUTE_NOT_FOUND_MESSAGE.to_string(),
            AppError::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            AppError::Creation(_) => CREATION_FAILED_MESSAGE.to_string(),
            AppError::Config(_) | AppError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Validation(errors) => AppError::Validation(errors),
            ReservationError::Duplicate => AppError::Duplicate,
            other => AppError::Creation(anyhow::Error::new(other)),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Duplicate => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } | AppError::RouteNotFound => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Creation(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // 记录错误日志
        match self {
            AppError::Creation(err) => {
                tracing::error!(error = %err, "[预约错误] {:?}", err);
            }
            AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "[服务器错误] {}", self);
            }
            _ => {
                tracing::info!("Client error: {}", self);
            }
        }

        let body = match self {
            AppError::Validation(errors) => json!({
                "success": false,
                "errors": errors,
            }),
            _ => json!({
                "success": false,
                "error": self.client_message(),
            }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 成功响应结构
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
