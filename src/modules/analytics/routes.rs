use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::{json, Value};

use super::event::AnalyticsEvent;
use crate::comm::{ClientIp, JsonBody};

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/analytics", web::post().to(track_event));
}

/// 分析事件追踪，总是返回成功
pub async fn track_event(client_ip: ClientIp, body: JsonBody<Value>) -> HttpResponse {
    AnalyticsEvent::from_body(&body, client_ip.0, Utc::now()).log();

    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "事件已记录"
    }))
}
