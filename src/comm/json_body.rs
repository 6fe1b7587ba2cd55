use actix_web::{dev::Payload, mime, web, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::ops::Deref;

use crate::error::AppError;

/// JSON 请求体
///
/// 只解析 `application/json` 请求，空请求体和其他类型的请求体都按 `{}` 处理。
/// 顶层必须是对象或数组；无法解析时返回 [`AppError::Internal`]。
/// 大小上限取自应用数据中的 [`web::PayloadConfig`]。
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T> JsonBody<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for JsonBody<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// 请求是否声明了 `application/json`（允许带 charset 等参数）
pub fn is_json_content_type(req: &HttpRequest) -> bool {
    match req.mime_type() {
        Ok(Some(content_type)) => {
            content_type.type_() == mime::APPLICATION && content_type.subtype() == mime::JSON
        }
        _ => false,
    }
}

/// 解析请求体；`is_json` 为 false 或请求体为空时得到 `{}`
pub fn parse_body<T: DeserializeOwned>(is_json: bool, bytes: &[u8]) -> Result<T, AppError> {
    let value = if is_json && !bytes.is_empty() {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("请求体解析失败: {}", e)))?;
        if !(value.is_object() || value.is_array()) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "请求体顶层必须是对象或数组"
            )));
        }
        value
    } else {
        Value::Object(Map::new())
    };

    serde_json::from_value(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("请求体格式错误: {}", e)))
}

impl<T: DeserializeOwned + 'static> FromRequest for JsonBody<T> {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        if !is_json_content_type(req) {
            return Box::pin(async { parse_body(false, &[]).map(JsonBody) });
        }

        let bytes = web::Bytes::from_request(req, payload);
        Box::pin(async move {
            let bytes = bytes
                .await
                .map_err(|e| AppError::Internal(anyhow::anyhow!("请求体读取失败: {}", e)))?;
            parse_body(true, &bytes).map(JsonBody)
        })
    }
}
