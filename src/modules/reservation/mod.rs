/// 预约模块
/// 校验、存储、统计以及对应的 HTTP 接口
pub mod models;
pub mod routes;
pub mod store;
pub mod validation;

pub use store::{ReservationError, ReservationStore};
