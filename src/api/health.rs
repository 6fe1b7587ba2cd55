use actix_web::{web, HttpResponse};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::time::Instant;

/// 进程启动时间，用于计算运行时长
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    started_at: Instant,
}

impl Uptime {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// 已运行秒数
    pub fn seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

impl Default for Uptime {
    fn default() -> Self {
        Self::start()
    }
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(health_check));
}

/// 健康检查
pub async fn health_check(uptime: web::Data<Uptime>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "uptime": uptime.seconds()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_health_check() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Uptime::start()))
                .configure(register),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    }
}
