use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// 一条待记录的分析事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub event: Value,
    pub params: Value,
    pub timestamp: Value,
    pub ip: String,
}

impl AnalyticsEvent {
    /// 从任意请求体中提取事件
    ///
    /// 缺失的字段记为 null；客户端没有给出有效时间戳时使用服务器接收时间。
    pub fn from_body(body: &Value, ip: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        let field = |name: &str| body.get(name).cloned().unwrap_or(Value::Null);

        let timestamp = match field("timestamp") {
            value if is_falsy(&value) => {
                Value::String(received_at.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            value => value,
        };

        Self {
            event: field("eventName"),
            params: field("eventParams"),
            timestamp,
            ip: ip.into(),
        }
    }

    /// 写入事件日志
    pub fn log(&self) {
        info!(
            event = %self.event,
            params = %self.params,
            timestamp = %self.timestamp,
            ip = %self.ip,
            "[事件追踪]"
        );
    }
}

/// null、false、0、空串都视为未提供
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
