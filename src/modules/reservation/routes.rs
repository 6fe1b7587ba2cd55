use actix_web::{http::header, web, HttpRequest, HttpResponse};
use std::sync::Arc;

use super::models::{
    CreateReservationRequest, RequestContext, ReservationCreated, ReservationSummary,
};
use super::store::ReservationStore;
use crate::comm::{ClientIp, JsonBody};
use crate::error::{ApiResponse, AppError, AppResult, RESERVATION_NOT_FOUND_MESSAGE};

pub fn register(cfg: &mut web::ServiceConfig) {
    // 方法不匹配时交给应用的 404 兜底
    cfg.route("/api/reservations", web::post().to(create_reservation))
        .route(
            "/api/reservations/{reservation_number}",
            web::get().to(get_reservation),
        )
        .route("/api/stats", web::get().to(get_stats));
}

/// 创建预约
pub async fn create_reservation(
    store: web::Data<Arc<ReservationStore>>,
    req: HttpRequest,
    client_ip: ClientIp,
    body: JsonBody<CreateReservationRequest>,
) -> AppResult<HttpResponse> {
    let context = RequestContext {
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        ip: client_ip.0,
    };

    let reservation = store.create(&body, context)?;

    Ok(HttpResponse::Created().json(ApiResponse::success(ReservationCreated::from(
        &reservation,
    ))))
}

/// 获取预约信息
pub async fn get_reservation(
    store: web::Data<Arc<ReservationStore>>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let reservation_number = path.into_inner();
    let reservation = store
        .find_by_number(&reservation_number)
        .ok_or_else(|| AppError::not_found(RESERVATION_NOT_FOUND_MESSAGE))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(ReservationSummary::from(&reservation))))
}

/// 获取统计数据
pub async fn get_stats(store: web::Data<Arc<ReservationStore>>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(store.compute_stats()))
}
