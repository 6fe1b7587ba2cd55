/// 分析事件模块
/// 只做日志记录，不校验事件结构
pub mod event;
pub mod routes;

pub use event::AnalyticsEvent;
